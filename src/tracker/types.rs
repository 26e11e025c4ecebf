use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::elements::ElementRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ActionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A pending "start following" at `trigger_at`. `display_stop` only marks
/// the end of the interval of interest.
#[derive(Debug, Clone)]
pub struct WaitingAction {
    pub id: ActionId,
    pub record: Arc<ElementRecord>,
    pub trigger_at: DateTime<Utc>,
    pub display_stop: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Waiting in the queue until its trigger time.
    Queued(ActionId),
    /// The trigger time had passed but the window is still open; the mount
    /// was told to follow straight away and nothing was queued.
    FollowingNow,
}
