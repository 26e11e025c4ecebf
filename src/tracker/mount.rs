use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::elements::ElementRecord;
use crate::tracker::error::ActuatorError;

/// Reference frame for equatorial coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Frame {
    J2000,
    Apparent,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MountActivity {
    Idle,
    Slewing,
    Following,
    Parked,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Azimuth,
    Altitude,
}

/// Snapshot returned by a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MountStatus {
    pub timestamp: DateTime<Utc>,
    pub connected: bool,
    pub azimuth_axis_enabled: bool,
    pub altitude_axis_enabled: bool,
    /// Sidereal tracking, independent of following a satellite.
    pub tracking: bool,
    pub activity: MountActivity,
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
    /// Name of the satellite or target being followed, if any.
    pub target: Option<String>,
}

/// Tracking mount driver.
///
/// Calls are synchronous and made from scheduler timer tasks, so an
/// implementation talking to slow hardware should hand work off internally
/// rather than block for long.
pub trait Mount: Send + Sync {
    fn connect(&self) -> Result<(), ActuatorError>;

    fn disconnect(&self) -> Result<(), ActuatorError>;

    fn set_axis_enabled(&self, axis: Axis, enabled: bool) -> Result<(), ActuatorError>;

    fn follow_elements(&self, record: &ElementRecord) -> Result<(), ActuatorError>;

    fn goto_alt_az(&self, altitude_deg: f64, azimuth_deg: f64) -> Result<(), ActuatorError>;

    fn goto_ra_dec(&self, ra_hours: f64, dec_deg: f64, frame: Frame) -> Result<(), ActuatorError>;

    fn stop(&self) -> Result<(), ActuatorError>;

    /// Park at the park position, or at the current pointing
    /// when `here` is set.
    fn park(&self, here: bool) -> Result<(), ActuatorError>;

    fn home(&self) -> Result<(), ActuatorError>;

    fn set_tracking(&self, enabled: bool) -> Result<(), ActuatorError>;

    /// Answers while disconnected too, with `connected` unset.
    fn status(&self) -> Result<MountStatus, ActuatorError>;
}
