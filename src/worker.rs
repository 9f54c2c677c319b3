//! Fixed-size pool of worker threads
//!
//! Workers are spawned once and joined once. Each one loops on
//! `JobQueue::dequeue` until the queue reports shutdown.

use crate::context::RunContext;
use crate::core::errors::{DispatchError, Result};
use crate::script::{ExecSummary, Interpreter, Script};
use crate::trace::EventTrace;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Per-worker totals, returned when the worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub index: usize,
    pub jobs: u64,
    pub ops: ExecSummary,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerSummary>>,
}

impl WorkerPool {
    /// Spawn `size` workers sharing `ctx`.
    ///
    /// With `trace_dir` set, worker `i` writes its events to
    /// `trace_dir/threadNN.txt`. If a trace file or a thread cannot be
    /// created, the workers already running are shut down and joined
    /// before the error is returned.
    pub fn spawn(ctx: &Arc<RunContext>, size: usize, trace_dir: Option<&Path>) -> Result<Self> {
        let mut pool = Self {
            handles: Vec::with_capacity(size),
        };

        for index in 0..size {
            if let Err(e) = pool.spawn_worker(ctx, index, trace_dir) {
                error!(worker = index, error = %e, "Failed to start worker");
                ctx.queue.trigger_shutdown();
                pool.join();
                return Err(e);
            }
        }

        info!(workers = size, "Worker pool started");
        Ok(pool)
    }

    fn spawn_worker(
        &mut self,
        ctx: &Arc<RunContext>,
        index: usize,
        trace_dir: Option<&Path>,
    ) -> Result<()> {
        let trace = match trace_dir {
            Some(dir) => EventTrace::for_worker(dir, index, true, ctx.clock)?,
            None => EventTrace::disabled(ctx.clock),
        };
        let ctx = Arc::clone(ctx);

        let handle = thread::Builder::new()
            .name(format!("worker-{:02}", index))
            .spawn(move || run_worker(index, &ctx, trace))
            .map_err(|e| {
                DispatchError::resource_exhausted("worker thread", format!("worker {}", index), e)
            })?;

        self.handles.push(handle);
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit.
    ///
    /// Only returns once the queue has been shut down; a worker that
    /// panicked is logged and left out of the result.
    pub fn join(self) -> Vec<WorkerSummary> {
        let mut summaries = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.join() {
                Ok(summary) => summaries.push(summary),
                Err(_) => error!("Worker thread panicked"),
            }
        }
        summaries
    }
}

fn run_worker(index: usize, ctx: &RunContext, mut trace: EventTrace) -> WorkerSummary {
    let mut summary = WorkerSummary {
        index,
        ..Default::default()
    };
    let interpreter = Interpreter::new(&ctx.counters);
    debug!(worker = index, "Worker waiting for jobs");

    while let Some(active) = ctx.queue.dequeue() {
        let job = active.job();
        trace.job_start(&job.line);
        let script = Script::parse(&job.script);
        debug!(
            worker = index,
            job = job.id,
            ordinal = active.ordinal(),
            counter_ops = script.counter_ops(),
            "Job started"
        );

        let ops = interpreter.run(&script);
        let turnaround = job.enqueued_at.elapsed();
        ctx.stats.record(turnaround);

        trace.job_end(&job.line);
        debug!(
            worker = index,
            job = job.id,
            turnaround_ms = turnaround.as_millis() as u64,
            "Job finished"
        );

        summary.jobs += 1;
        summary.ops.increments += ops.increments;
        summary.ops.decrements += ops.decrements;
        summary.ops.sleeps += ops.sleeps;
        summary.ops.skipped += ops.skipped;

        active.complete();
    }

    debug!(worker = index, jobs = summary.jobs, "Worker exiting");
    summary
}
