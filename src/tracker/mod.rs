mod dry_run;
mod error;
mod monitor;
mod mount;
mod scheduler;
mod types;

pub use dry_run::{DryRunMount, MountCommand};
pub use error::{ActuatorError, TrackingError};
pub use monitor::StatusMonitor;
pub use mount::{Axis, Frame, Mount, MountActivity, MountStatus};
pub use scheduler::TrackingScheduler;
pub use types::{ActionId, ScheduleOutcome, WaitingAction};
