mod error;
mod fields;
mod record;

pub use error::FormatError;
pub use fields::checksum;
pub use record::{ElementRecord, InternationalDesignator, RawElements};
