//! Control thread: reads directives, feeds the queue, drives shutdown
//!
//! A run goes through fixed phases:
//! 1. counters are created with value 0 and traces truncated,
//! 2. the worker pool starts,
//! 3. directives are consumed in order,
//! 4. an implicit `dispatcher_wait`, then shutdown and join,
//! 5. the report is written.

pub mod directive;

pub use directive::Directive;

use crate::config::DispatchConfig;
use crate::context::RunContext;
use crate::core::errors::{DispatchError, Result};
use crate::counters::{CounterBackend, CounterStore, FileBackend};
use crate::queue::{Job, JobId};
use crate::stats::RunReport;
use crate::trace::{EventTrace, RunClock};
use crate::worker::WorkerPool;
use chrono::Utc;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

pub struct Dispatcher {
    config: DispatchConfig,
    backend: Arc<dyn CounterBackend>,
    clock: RunClock,
}

impl Dispatcher {
    /// Validate `config` and prepare a dispatcher writing counters as
    /// files into the configured output directory
    pub fn new(config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(FileBackend::new(&config.output_dir));
        Ok(Self {
            config,
            backend,
            clock: RunClock::start(),
        })
    }

    /// Persist counters through `backend` instead of files
    pub fn with_backend(mut self, backend: Arc<dyn CounterBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Measure trace offsets and total runtime from `clock`
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run the command file at `path`.
    ///
    /// An unreadable file is a configuration error, reported before any
    /// counter or thread is created.
    pub fn run_file(&self, path: &Path) -> Result<RunReport> {
        let file = File::open(path).map_err(|e| {
            DispatchError::configuration(format!(
                "cannot open command file {}: {}",
                path.display(),
                e
            ))
        })?;
        self.run(BufReader::new(file))
    }

    /// Run every directive from `source`, then shut down and report.
    ///
    /// A read error on `source` ends input early; the run still shuts down
    /// cleanly and writes its report before the error is returned.
    pub fn run<R: BufRead>(&self, source: R) -> Result<RunReport> {
        let started_at = Utc::now();
        let output_dir = self.config.output_dir.as_path();

        fs::create_dir_all(output_dir).map_err(|e| {
            DispatchError::configuration(format!(
                "cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let counters = CounterStore::new(self.config.num_counters, Arc::clone(&self.backend));
        counters.initialize()?;

        let mut trace =
            EventTrace::for_dispatcher(output_dir, self.config.log_enabled, self.clock)?;
        let ctx = Arc::new(RunContext::new(counters, self.clock));

        let trace_dir = self.config.log_enabled.then_some(output_dir);
        let pool = WorkerPool::spawn(&ctx, self.config.num_threads, trace_dir)?;

        info!(
            workers = self.config.num_threads,
            counters = self.config.num_counters,
            "Dispatcher started"
        );

        let fed = feed(&ctx, source, &mut trace);
        if let Err(e) = &fed {
            error!(error = %e, "Command source failed, shutting down");
        }

        // Final barrier: everything enqueued must finish before shutdown.
        ctx.queue.wait_idle();
        ctx.queue.trigger_shutdown();
        let summaries = pool.join();
        debug!(workers = summaries.len(), "Worker pool joined");

        let report = RunReport::new(started_at, self.clock.elapsed(), ctx.stats.snapshot());
        let path = report.write_to_dir(output_dir)?;
        info!(
            jobs = report.jobs_completed(),
            report = %path.display(),
            "Run complete"
        );

        fed.map(|_| report)
    }
}

/// Consume directives until `source` is exhausted, returning the number
/// of jobs enqueued
fn feed<R: BufRead>(ctx: &RunContext, source: R, trace: &mut EventTrace) -> Result<u64> {
    let mut next_id: JobId = 0;

    for (index, line) in source.lines().enumerate() {
        let line =
            line.map_err(|e| DispatchError::io(format!("read command line {}", index + 1), e))?;
        let line = line.trim();
        let Some(directive) = Directive::parse(line) else {
            continue;
        };
        trace.command_read(line);

        match directive {
            Directive::Worker(script) => {
                ctx.queue.enqueue(Job::new(next_id, line, script))?;
                debug!(job = next_id, "Job enqueued");
                next_id += 1;
            }
            Directive::DispatcherSleep(duration) => {
                debug!(ms = duration.as_millis() as u64, "Dispatcher sleeping");
                thread::sleep(duration);
            }
            Directive::DispatcherWait => {
                debug!("Dispatcher waiting for idle queue");
                ctx.queue.wait_idle();
            }
            Directive::Unknown(text) => {
                let e = DispatchError::parse(text, "unknown or malformed directive");
                info!(line = index + 1, error = %e, "Skipping command line");
            }
        }
    }

    Ok(next_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::MemoryBackend;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn dispatcher(
        dir: &TempDir,
        threads: usize,
        counters: usize,
    ) -> (Dispatcher, Arc<MemoryBackend>) {
        let config = DispatchConfig::builder()
            .num_threads(threads)
            .num_counters(counters)
            .output_dir(dir.path())
            .build()
            .unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let dispatcher = Dispatcher::new(config)
            .unwrap()
            .with_backend(backend.clone());
        (dispatcher, backend)
    }

    #[test]
    fn test_run_counts_jobs() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, backend) = dispatcher(&dir, 4, 2);

        let commands = "worker increment0\n\nworker repeat3;increment1\nworker decrement0\n";
        let report = dispatcher.run(Cursor::new(commands)).unwrap();

        assert_eq!(report.jobs_completed(), 3);
        assert_eq!(backend.get(0), Some(0));
        assert_eq!(backend.get(1), Some(3));
        assert!(dir.path().join("stats.txt").exists());
    }

    #[test]
    fn test_unknown_directives_are_skipped() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, backend) = dispatcher(&dir, 2, 1);

        let commands = "launch rockets\ndispatcher_msleep\nworker increment0\n";
        let report = dispatcher.run(Cursor::new(commands)).unwrap();

        assert_eq!(report.jobs_completed(), 1);
        assert_eq!(backend.get(0), Some(1));
    }

    #[test]
    fn test_empty_source() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, _) = dispatcher(&dir, 3, 0);

        let report = dispatcher.run(Cursor::new("")).unwrap();
        assert_eq!(report.jobs_completed(), 0);
        assert_eq!(report.stats.min, None);
    }

    #[test]
    fn test_missing_command_file() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, backend) = dispatcher(&dir, 1, 1);

        let err = dispatcher
            .run_file(&dir.path().join("no-such-file.txt"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration { .. }));
        // Nothing was initialized.
        assert_eq!(backend.get(0), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DispatchConfig {
            num_threads: 0,
            ..DispatchConfig::default()
        };
        assert!(Dispatcher::new(config).is_err());
    }
}
