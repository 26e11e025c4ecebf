mod catalog;
mod types;

pub use catalog::ElementCatalog;
pub use types::{GroupError, LoadReport, LoadSummary};
