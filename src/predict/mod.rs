mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod types;

pub use error::{PredictError, PropagationError};
pub use ground_station::Site;
pub use pass_finder::{build_time_series, extract_passes, filter_and_sort, window_stop, PassFinder};
pub use propagation::{LookAngle, Propagator, Sgp4Propagator};
pub use types::{Pass, PassReport, Sample};
