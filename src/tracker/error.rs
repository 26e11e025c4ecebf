use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::elements::FormatError;

/// Failure reported by a mount driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    #[error("mount not connected")]
    NotConnected,
    #[error("mount rejected command: {0}")]
    Rejected(String),
    #[error("mount communication failed: {0}")]
    Communication(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("pass already elapsed (window ended {0})")]
    Elapsed(DateTime<Utc>),
    #[error("pass has a single sample, not enough data to schedule")]
    InsufficientData,
    #[error("invalid elements: {0}")]
    Format(#[from] FormatError),
    #[error("mount error: {0}")]
    Actuator(#[from] ActuatorError),
}
