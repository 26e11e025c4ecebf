use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::elements::ElementRecord;
use crate::predict::error::PropagationError;

/// One point of an altitude/azimuth series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
}

/// A contiguous above-horizon interval of one satellite, anchored at a local
/// altitude maximum.
#[derive(Debug, Clone)]
pub struct Pass {
    pub record: Arc<ElementRecord>,
    pub peak: Sample,
    /// Rise sample to set sample, inclusive.
    pub track: Vec<Sample>,
}

impl Pass {
    pub fn rise(&self) -> Sample {
        self.track.first().copied().unwrap_or(self.peak)
    }

    pub fn set(&self) -> Sample {
        self.track.last().copied().unwrap_or(self.peak)
    }

    /// A single in-window sample: no horizon crossing was observed, so the
    /// pass cannot be scheduled.
    pub fn is_degenerate(&self) -> bool {
        self.track.len() <= 1
    }

    pub fn duration(&self) -> Duration {
        self.set().timestamp - self.rise().timestamp
    }
}

/// Result of a prediction run: the passes found and the records that failed.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub passes: Vec<Pass>,
    pub failures: Vec<PropagationError>,
}
