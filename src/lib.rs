//! # jobdispatch
//!
//! A command-driven job dispatcher. A single control thread reads
//! directives from a command file and feeds `worker` jobs into a FIFO
//! queue; a fixed pool of worker threads runs each job's script against a
//! set of file-backed counters.
//!
//! ```rust,no_run
//! use jobdispatch::{DispatchConfig, Dispatcher};
//! use std::path::Path;
//!
//! fn main() -> jobdispatch::Result<()> {
//!     let config = DispatchConfig::builder()
//!         .num_threads(4)
//!         .num_counters(10)
//!         .log_enabled(true)
//!         .build()?;
//!
//!     let report = Dispatcher::new(config)?.run_file(Path::new("cmdfile.txt"))?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

// Core infrastructure modules
pub mod core;

pub mod config;
pub mod context;
pub mod counters;
pub mod dispatcher;
pub mod queue;
pub mod script;
pub mod stats;
pub mod trace;
pub mod worker;

// Re-exports for convenience
pub use crate::core::errors::{DispatchError, Result};
pub use crate::core::limits::{DispatchLimits, MAX_COUNTERS, MAX_THREADS};
pub use config::{DispatchConfig, DispatchConfigBuilder};
pub use context::RunContext;
pub use counters::{CounterBackend, CounterId, CounterStore, FileBackend, MemoryBackend};
pub use dispatcher::{Directive, Dispatcher};
pub use queue::{ActiveJob, Job, JobId, JobQueue, QueueStatus};
pub use script::{Interpreter, Script, Step};
pub use stats::{RunReport, StatsAggregator, StatsSnapshot};
pub use trace::{EventTrace, RunClock};
pub use worker::{WorkerPool, WorkerSummary};
