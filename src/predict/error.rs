use thiserror::Error;

use crate::elements::ElementRecord;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("invalid time range: {0}")]
    InvalidRange(String),
    #[error("invalid site: {0}")]
    InvalidSite(String),
    #[error("site must be set before computing passes")]
    SiteNotSet,
}

/// One record the propagator could not handle during a run. Collected
/// alongside the passes instead of failing the batch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("propagation failed for {name} ({catalog_number}): {reason}")]
pub struct PropagationError {
    pub name: String,
    pub catalog_number: u32,
    pub reason: String,
}

impl PropagationError {
    pub fn new(record: &ElementRecord, reason: impl Into<String>) -> Self {
        Self {
            name: record.display_name().to_string(),
            catalog_number: record.catalog_number(),
            reason: reason.into(),
        }
    }
}
