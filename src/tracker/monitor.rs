use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::events::{Event, EventBus};
use crate::tracker::mount::{Mount, MountStatus};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Background poll of [`Mount::status`], republished as
/// [`Event::MountStatusChanged`].
pub struct StatusMonitor {
    latest: Arc<StdMutex<Option<MountStatus>>>,
    worker: Option<WorkerHandle>,
}

impl StatusMonitor {
    pub fn start(mount: Arc<dyn Mount>, events: EventBus, interval: Duration) -> Self {
        let latest = Arc::new(StdMutex::new(None));
        let (stop_tx, stop_rx) = oneshot::channel();
        log::info!("Polling mount status every {:?}", interval);
        let join = tokio::spawn(run_monitor_loop(
            mount,
            events,
            latest.clone(),
            interval,
            stop_rx,
        ));

        Self {
            latest,
            worker: Some(WorkerHandle { stop_tx, join }),
        }
    }

    /// Last successful poll, if any.
    pub fn latest(&self) -> Option<MountStatus> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Signal the loop and wait a bounded time for it to exit.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.stop_tx.send(());
        let abort = worker.join.abort_handle();
        if tokio::time::timeout(STOP_TIMEOUT, worker.join).await.is_err() {
            log::warn!("Status monitor did not stop within {:?}, aborting", STOP_TIMEOUT);
            abort.abort();
        }
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join.abort();
        }
    }
}

async fn run_monitor_loop(
    mount: Arc<dyn Mount>,
    events: EventBus,
    latest: Arc<StdMutex<Option<MountStatus>>>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop_rx => {
                log::info!("Status monitor stopped");
                return;
            }
        }

        match mount.status() {
            Ok(status) => {
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(status.clone());
                events.publish(Event::MountStatusChanged(status));
            }
            Err(e) => log::warn!("Mount status poll failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::dry_run::DryRunMount;
    use crate::tracker::mount::MountActivity;

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_stopped() {
        let mount = Arc::new(DryRunMount::connected());
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let mut monitor = StatusMonitor::start(mount.clone(), events, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let latest = monitor.latest().unwrap();
        assert_eq!(latest.activity, MountActivity::Idle);

        monitor.stop().await;
        assert!(!monitor.is_running());

        let mut polls = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, Event::MountStatusChanged(_)) {
                polls += 1;
            }
        }
        // Immediate first tick, then one per second.
        assert_eq!(polls, 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_follows_mount() {
        let mount = Arc::new(DryRunMount::connected());
        let monitor = StatusMonitor::start(mount.clone(), EventBus::default(), Duration::from_secs(1));
        mount.goto_alt_az(30.0, 120.0).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let latest = monitor.latest().unwrap();
        assert_eq!(latest.activity, MountActivity::Slewing);
        assert_eq!(latest.altitude_deg, 30.0);
    }
}
