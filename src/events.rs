use std::sync::Arc;

use tokio::sync::broadcast;

use crate::elements::ElementRecord;
use crate::predict::{Pass, PropagationError};
use crate::tracker::{ActionId, MountStatus, WaitingAction};

const DEFAULT_CAPACITY: usize = 64;

/// Notifications for whatever drives the UI or automation around the core.
#[derive(Debug, Clone)]
pub enum Event {
    CatalogUpdated {
        records: Vec<Arc<ElementRecord>>,
    },
    PassesComputed {
        passes: Vec<Pass>,
        failures: Vec<PropagationError>,
    },
    /// Waiting queue after a mutation, sorted by trigger time.
    QueueChanged(Vec<WaitingAction>),
    MountStatusChanged(MountStatus),
    ActuatorFailed {
        action: Option<ActionId>,
        message: String,
    },
}

/// Fan-out of [`Event`]s. Publishing never blocks; slow subscribers lag
/// and miss old events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
