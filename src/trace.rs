//! Optional per-thread event trace files
//!
//! When enabled, the dispatcher appends to `dispatcher.txt` and worker `N`
//! to `threadNN.txt`. Each file has exactly one writer, so no locking is
//! involved. Write failures are logged and otherwise ignored.

use crate::core::errors::{DispatchError, Result};
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

pub const DISPATCHER_TRACE_FILE: &str = "dispatcher.txt";

/// File name of worker `index`'s trace
pub fn worker_trace_file(index: usize) -> String {
    format!("thread{:02}.txt", index)
}

/// Monotonic clock anchored at process start
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    start: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Milliseconds since start
    pub fn offset_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }
}

/// Append-only event trace owned by a single thread
#[derive(Debug)]
pub struct EventTrace {
    clock: RunClock,
    sink: Option<TraceFile>,
}

#[derive(Debug)]
struct TraceFile {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl EventTrace {
    /// A trace that records nothing
    pub fn disabled(clock: RunClock) -> Self {
        Self { clock, sink: None }
    }

    /// Create (truncating) the trace file at `path`
    pub fn create(path: &Path, clock: RunClock) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| DispatchError::io(format!("create {}", path.display()), e))?;
        Ok(Self {
            clock,
            sink: Some(TraceFile {
                path: path.to_path_buf(),
                writer: LineWriter::new(file),
            }),
        })
    }

    /// Dispatcher trace in `dir`, or a disabled trace
    pub fn for_dispatcher(dir: &Path, enabled: bool, clock: RunClock) -> Result<Self> {
        if enabled {
            Self::create(&dir.join(DISPATCHER_TRACE_FILE), clock)
        } else {
            Ok(Self::disabled(clock))
        }
    }

    /// Trace for worker `index` in `dir`, or a disabled trace
    pub fn for_worker(dir: &Path, index: usize, enabled: bool, clock: RunClock) -> Result<Self> {
        if enabled {
            Self::create(&dir.join(worker_trace_file(index)), clock)
        } else {
            Ok(Self::disabled(clock))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn command_read(&mut self, line: &str) {
        self.event(format_args!("read cmd line: {}", line));
    }

    pub fn job_start(&mut self, line: &str) {
        self.event(format_args!("START job {}", line));
    }

    pub fn job_end(&mut self, line: &str) {
        self.event(format_args!("END job {}", line));
    }

    fn event(&mut self, message: std::fmt::Arguments<'_>) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let offset = self.clock.offset_ms();
        if let Err(e) = writeln!(sink.writer, "TIME {}: {}", offset, message) {
            warn!(path = %sink.path.display(), error = %e, "Failed to write trace line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_trace_lines() {
        let dir = TempDir::new().unwrap();
        let clock = RunClock::start();

        let mut trace = EventTrace::for_worker(dir.path(), 3, true, clock).unwrap();
        assert!(trace.is_enabled());
        trace.job_start("worker increment0");
        trace.job_end("worker increment0");
        drop(trace);

        let text = fs::read_to_string(dir.path().join("thread03.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("TIME "));
        assert!(lines[0].ends_with(": START job worker increment0"));
        assert!(lines[1].ends_with(": END job worker increment0"));
    }

    #[test]
    fn test_dispatcher_trace_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DISPATCHER_TRACE_FILE);
        fs::write(&path, "stale\n").unwrap();

        let mut trace = EventTrace::for_dispatcher(dir.path(), true, RunClock::start()).unwrap();
        trace.command_read("dispatcher_wait");
        drop(trace);

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains(": read cmd line: dispatcher_wait"));
    }

    #[test]
    fn test_disabled_trace_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut trace = EventTrace::for_worker(dir.path(), 0, false, RunClock::start()).unwrap();
        trace.job_start("worker msleep1");

        assert!(!trace.is_enabled());
        assert!(!dir.path().join("thread00.txt").exists());
    }

    #[test]
    fn test_offsets_are_monotonic() {
        let clock = RunClock::start();
        let first = clock.offset_ms();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.offset_ms() >= first + 5);
    }
}
