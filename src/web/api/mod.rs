pub mod catalog;
pub mod error;
pub mod mount;
pub mod predict;
pub mod queue;
