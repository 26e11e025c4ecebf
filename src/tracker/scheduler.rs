use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use crate::elements::ElementRecord;
use crate::events::{Event, EventBus};
use crate::predict::Pass;
use crate::tracker::error::TrackingError;
use crate::tracker::mount::Mount;
use crate::tracker::types::{ActionId, ScheduleOutcome, WaitingAction};

type QueueKey = (DateTime<Utc>, u64);

struct Pending {
    action: WaitingAction,
    key: QueueKey,
    timer: AbortHandle,
}

/// Pending actions indexed by id, with a sorted view keyed by trigger time
/// and arrival order. Presence here is the `Pending` state: whichever of
/// cancel or firing removes an entry first owns its outcome.
#[derive(Default)]
struct Queue {
    order: BTreeMap<QueueKey, ActionId>,
    pending: HashMap<ActionId, Pending>,
    next_seq: u64,
}

impl Queue {
    fn insert(&mut self, action: WaitingAction, timer: AbortHandle) {
        let key = (action.trigger_at, self.next_seq);
        self.next_seq += 1;
        self.order.insert(key, action.id);
        self.pending.insert(action.id, Pending { action, key, timer });
    }

    fn remove(&mut self, id: ActionId) -> Option<Pending> {
        let pending = self.pending.remove(&id)?;
        self.order.remove(&pending.key);
        Some(pending)
    }

    fn snapshot(&self) -> Vec<WaitingAction> {
        self.order
            .values()
            .filter_map(|id| self.pending.get(id))
            .map(|p| p.action.clone())
            .collect()
    }
}

struct Inner {
    mount: Arc<dyn Mount>,
    events: EventBus,
    queue: Mutex<Queue>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, id: ActionId) {
        let action = {
            let mut queue = self.lock();
            let Some(pending) = queue.remove(id) else {
                log::debug!("Timer for {} fired after cancellation", id);
                return;
            };
            self.events.publish(Event::QueueChanged(queue.snapshot()));
            pending.action
        };

        log::info!(
            "Trigger reached for {} ({}), following",
            action.record.display_name(),
            id
        );
        if let Err(e) = self.mount.follow_elements(&action.record) {
            log::error!(
                "Mount failed to follow {} ({}): {}",
                action.record.display_name(),
                id,
                e
            );
            self.events.publish(Event::ActuatorFailed {
                action: Some(id),
                message: e.to_string(),
            });
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let queue = self.queue.get_mut().unwrap_or_else(PoisonError::into_inner);
        for pending in queue.pending.values() {
            pending.timer.abort();
        }
    }
}

/// Waiting queue of time-triggered `follow_elements` calls.
///
/// Cloning gives another handle to the same queue. Scheduling must happen
/// inside a tokio runtime since every pending action owns a timer task.
#[derive(Clone)]
pub struct TrackingScheduler {
    inner: Arc<Inner>,
}

impl TrackingScheduler {
    pub fn new(mount: Arc<dyn Mount>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                mount,
                events,
                queue: Mutex::new(Queue::default()),
            }),
        }
    }

    pub fn mount(&self) -> &Arc<dyn Mount> {
        &self.inner.mount
    }

    /// Queue a follow of `record` at `trigger_at`.
    ///
    /// A trigger already in the past with `display_stop` still ahead starts
    /// following immediately instead; once `display_stop` has passed the
    /// request is rejected.
    pub fn schedule_follow(
        &self,
        record: Arc<ElementRecord>,
        trigger_at: DateTime<Utc>,
        display_stop: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, TrackingError> {
        let now = Utc::now();
        if now >= display_stop {
            log::warn!(
                "Pass of {} already happened (ended {})",
                record.display_name(),
                display_stop
            );
            return Err(TrackingError::Elapsed(display_stop));
        }
        if trigger_at <= now {
            log::warn!(
                "Pass of {} already started, tracking the remainder",
                record.display_name()
            );
            self.inner.mount.follow_elements(&record)?;
            return Ok(ScheduleOutcome::FollowingNow);
        }

        let delay = (trigger_at - now).to_std().unwrap_or_default();
        let id = ActionId::new();
        log::info!(
            "Add {} to waiting list as {}. Trigger at {} ({:?} away)",
            record.display_name(),
            id,
            trigger_at,
            delay
        );

        let action = WaitingAction {
            id,
            record,
            trigger_at,
            display_stop,
        };

        // Held across spawn so the timer cannot fire before the entry exists.
        let mut queue = self.inner.lock();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(id);
            }
        })
        .abort_handle();
        queue.insert(action, timer);
        self.inner
            .events
            .publish(Event::QueueChanged(queue.snapshot()));

        Ok(ScheduleOutcome::Queued(id))
    }

    /// Queue a follow over the pass's rise-to-set window.
    pub fn schedule_pass(&self, pass: &Pass) -> Result<ScheduleOutcome, TrackingError> {
        if pass.is_degenerate() {
            return Err(TrackingError::InsufficientData);
        }
        self.schedule_follow(
            pass.record.clone(),
            pass.rise().timestamp,
            pass.set().timestamp,
        )
    }

    /// Withdraw a pending action. False if it already fired, was already
    /// cancelled, or never existed.
    pub fn cancel(&self, id: ActionId) -> bool {
        let mut queue = self.inner.lock();
        match queue.remove(id) {
            Some(pending) => {
                pending.timer.abort();
                log::info!(
                    "Removed {} ({}) from the waiting list",
                    pending.action.record.display_name(),
                    id
                );
                self.inner
                    .events
                    .publish(Event::QueueChanged(queue.snapshot()));
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let mut queue = self.inner.lock();
        let cancelled = queue.pending.len();
        for (_, pending) in queue.pending.drain() {
            pending.timer.abort();
        }
        queue.order.clear();
        if cancelled > 0 {
            log::info!("Cleared {} waiting actions", cancelled);
            self.inner.events.publish(Event::QueueChanged(Vec::new()));
        }
        cancelled
    }

    /// Pending actions sorted by trigger time.
    pub fn queue(&self) -> Vec<WaitingAction> {
        self.inner.lock().snapshot()
    }
}
