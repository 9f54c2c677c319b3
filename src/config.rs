use crate::core::errors::{DispatchError, Result};
use crate::core::limits::DispatchLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dispatcher configuration, validated once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of worker threads in the pool
    pub num_threads: usize,
    /// Number of persisted counters, ids `0..num_counters`
    pub num_counters: usize,
    /// Write dispatcher and per-worker event traces
    pub log_enabled: bool,
    /// Directory receiving counter files, traces and the report
    pub output_dir: PathBuf,
    /// Bounds the other fields are validated against
    #[serde(default)]
    pub limits: DispatchLimits,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            num_threads: 4,
            num_counters: 10,
            log_enabled: false,
            output_dir: PathBuf::from("."),
            limits: DispatchLimits::default(),
        }
    }
}

impl DispatchConfig {
    /// Create a new builder for DispatchConfig
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::new()
    }

    /// Build a configuration from the raw positional command-line values.
    ///
    /// `log_mode` must be exactly 0 (disabled) or 1 (enabled).
    pub fn from_raw(threads: i64, counters: i64, log_mode: i64) -> Result<Self> {
        let num_threads = usize::try_from(threads).map_err(|_| {
            DispatchError::configuration_field(
                "num_threads",
                "a non-negative integer",
                threads.to_string(),
            )
        })?;
        let num_counters = usize::try_from(counters).map_err(|_| {
            DispatchError::configuration_field(
                "num_counters",
                "a non-negative integer",
                counters.to_string(),
            )
        })?;
        let log_enabled = match log_mode {
            0 => false,
            1 => true,
            other => {
                return Err(DispatchError::configuration_field(
                    "log_enabled",
                    "0 (disabled) or 1 (enabled)",
                    other.to_string(),
                ))
            }
        };

        Self::builder()
            .num_threads(num_threads)
            .num_counters(num_counters)
            .log_enabled(log_enabled)
            .build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.limits.check_threads(self.num_threads)?;
        self.limits.check_counters(self.num_counters)?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(DispatchError::configuration("output_dir must not be empty"));
        }
        Ok(())
    }

    /// Create a configuration for development/testing
    pub fn development() -> Self {
        Self {
            num_threads: 4,
            num_counters: 10,
            log_enabled: false,
            ..Default::default()
        }
    }
}

/// Builder for DispatchConfig
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl Default for DispatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
        }
    }

    /// Set the worker thread count
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = num_threads;
        self
    }

    /// Set the counter count
    pub fn num_counters(mut self, num_counters: usize) -> Self {
        self.config.num_counters = num_counters;
        self
    }

    /// Enable/disable event trace files
    pub fn log_enabled(mut self, enabled: bool) -> Self {
        self.config.log_enabled = enabled;
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Override the validation bounds
    pub fn limits(mut self, limits: DispatchLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<DispatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = DispatchConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_threads, 4);
        assert!(!config.log_enabled);
    }

    #[test]
    fn test_from_raw() {
        let config = DispatchConfig::from_raw(8, 3, 1).unwrap();
        assert_eq!(config.num_threads, 8);
        assert_eq!(config.num_counters, 3);
        assert!(config.log_enabled);

        assert!(DispatchConfig::from_raw(-1, 3, 0).is_err());
        assert!(DispatchConfig::from_raw(4, -3, 0).is_err());
        assert!(DispatchConfig::from_raw(4, 3, 2).is_err());
        assert!(DispatchConfig::from_raw(0, 3, 0).is_err());
        assert!(DispatchConfig::from_raw(4097, 3, 0).is_err());
        assert!(DispatchConfig::from_raw(4, 101, 0).is_err());
    }

    #[test]
    fn test_builder() {
        let config = DispatchConfig::builder()
            .num_threads(16)
            .num_counters(100)
            .log_enabled(true)
            .output_dir("/tmp/dispatch")
            .build()
            .unwrap();

        assert_eq!(config.num_threads, 16);
        assert_eq!(config.num_counters, 100);
        assert!(config.log_enabled);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/dispatch"));
    }

    #[test]
    fn test_builder_rejects_empty_output_dir() {
        let result = DispatchConfig::builder().output_dir("").build();
        assert!(matches!(result, Err(DispatchError::Configuration { .. })));
    }
}
