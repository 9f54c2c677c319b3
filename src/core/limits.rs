use crate::core::errors::{DispatchError, Result};
use serde::{Deserialize, Serialize};

/// Hard upper bound on worker threads
pub const MAX_THREADS: usize = 4096;
/// Hard upper bound on persisted counters
pub const MAX_COUNTERS: usize = 100;

/// Fixed bounds a configuration is validated against at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLimits {
    /// Maximum number of worker threads
    pub max_threads: usize,
    /// Maximum number of counters
    pub max_counters: usize,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_threads: MAX_THREADS,
            max_counters: MAX_COUNTERS,
        }
    }
}

impl DispatchLimits {
    /// Check a worker thread count against the bounds.
    ///
    /// At least one worker is required, otherwise any `worker` directive
    /// would leave the idle barrier waiting forever.
    pub fn check_threads(&self, threads: usize) -> Result<()> {
        if threads == 0 || threads > self.max_threads {
            return Err(DispatchError::configuration_field(
                "num_threads",
                format!("between 1 and {}", self.max_threads),
                threads.to_string(),
            ));
        }
        Ok(())
    }

    /// Check a counter count against the bounds
    pub fn check_counters(&self, counters: usize) -> Result<()> {
        if counters > self.max_counters {
            return Err(DispatchError::configuration_field(
                "num_counters",
                format!("between 0 and {}", self.max_counters),
                counters.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = DispatchLimits::default();
        assert!(limits.check_threads(1).is_ok());
        assert!(limits.check_threads(MAX_THREADS).is_ok());
        assert!(limits.check_counters(0).is_ok());
        assert!(limits.check_counters(MAX_COUNTERS).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let limits = DispatchLimits::default();
        assert!(limits.check_threads(0).is_err());
        assert!(limits.check_threads(MAX_THREADS + 1).is_err());
        assert!(limits.check_counters(MAX_COUNTERS + 1).is_err());
    }

    #[test]
    fn test_custom_limits() {
        let limits = DispatchLimits {
            max_threads: 2,
            max_counters: 1,
        };
        assert!(limits.check_threads(3).is_err());
        assert!(limits.check_counters(2).is_err());
    }
}
