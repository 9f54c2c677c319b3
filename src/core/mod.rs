// Core infrastructure shared by every component

pub mod errors;
pub mod limits;

// Re-export commonly used types
pub use errors::{DispatchError, Result};
pub use limits::{DispatchLimits, MAX_COUNTERS, MAX_THREADS};
