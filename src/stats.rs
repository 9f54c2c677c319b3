//! Turnaround statistics and the final run report

use crate::core::errors::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Name of the report file written into the output directory
pub const REPORT_FILE_NAME: &str = "stats.txt";

/// Thread-safe accumulator of job turnaround times
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<StatsSnapshot>,
}

/// Turnaround statistics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub count: u64,
    pub sum: Duration,
    pub min: Option<Duration>,
    pub max: Duration,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the turnaround of one completed job, at millisecond resolution
    pub fn record(&self, turnaround: Duration) {
        let turnaround = Duration::from_millis(turnaround.as_millis() as u64);
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        stats.count += 1;
        stats.sum += turnaround;
        stats.min = Some(stats.min.map_or(turnaround, |min| min.min(turnaround)));
        stats.max = stats.max.max(turnaround);
    }

    /// Current statistics.
    ///
    /// Only meaningful as a final figure once every worker has been joined.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsSnapshot {
    /// Mean turnaround, zero when no job completed
    pub fn average(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.sum / count,
            Err(_) => Duration::from_secs_f64(self.sum.as_secs_f64() / self.count as f64),
        }
    }

    /// Mean turnaround in fractional milliseconds
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms() as f64 / self.count as f64
        }
    }

    pub fn sum_ms(&self) -> u128 {
        self.sum.as_millis()
    }

    pub fn min_ms(&self) -> u128 {
        self.min.unwrap_or_default().as_millis()
    }

    pub fn max_ms(&self) -> u128 {
        self.max.as_millis()
    }
}

/// Summary written at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub total_runtime: Duration,
    pub stats: StatsSnapshot,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, total_runtime: Duration, stats: StatsSnapshot) -> Self {
        Self {
            started_at,
            total_runtime,
            stats,
        }
    }

    /// Number of jobs that ran to completion
    pub fn jobs_completed(&self) -> u64 {
        self.stats.count
    }

    /// Write the text report into `dir`, returning its path
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(REPORT_FILE_NAME);
        fs::write(&path, self.to_string())
            .map_err(|e| DispatchError::io(format!("write {}", path.display()), e))?;
        Ok(path)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "total running time: {} milliseconds",
            self.total_runtime.as_millis()
        )?;
        writeln!(
            f,
            "sum of jobs turnaround time: {} milliseconds",
            self.stats.sum_ms()
        )?;
        writeln!(
            f,
            "min job turnaround time: {} milliseconds",
            self.stats.min_ms()
        )?;
        writeln!(
            f,
            "average job turnaround time: {:.6} milliseconds",
            self.stats.average_ms()
        )?;
        writeln!(
            f,
            "max job turnaround time: {} milliseconds",
            self.stats.max_ms()
        )?;
        writeln!(f, "total jobs completed: {}", self.stats.count)
    }
}
