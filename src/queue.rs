//! FIFO job queue with blocking dequeue and an idle barrier
//!
//! All queue state lives behind one mutex. Two condition variables hang
//! off it: `not_empty` wakes workers waiting for a job (or for shutdown),
//! `idle` wakes anyone waiting for "no pending jobs and no active workers".

use crate::core::errors::{DispatchError, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::debug;

pub type JobId = u64;

/// A `worker` command line waiting for or undergoing execution
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Trimmed command line as read, `worker ...`
    pub line: String,
    /// Script text following the `worker` keyword
    pub script: String,
    pub enqueued_at: Instant,
}

impl Job {
    /// Create a job stamped with the current time
    pub fn new(id: JobId, line: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id,
            line: line.into(),
            script: script.into(),
            enqueued_at: Instant::now(),
        }
    }
}

/// Point-in-time view of the queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub active: usize,
    pub shutdown: bool,
}

impl QueueStatus {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.active == 0
    }
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    active: usize,
    shutdown: bool,
    claimed: u64,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.jobs.is_empty() && self.active == 0
    }
}

/// Unbounded FIFO shared by the dispatcher and the worker pool
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    idle: Condvar,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a job at the tail and wake one waiting worker
    pub fn enqueue(&self, job: Job) -> Result<()> {
        let mut state = self.lock();
        if state.shutdown {
            return Err(DispatchError::internal(format!(
                "job {} enqueued after shutdown",
                job.id
            )));
        }
        state.jobs.push_back(job);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until a job is available or the queue shuts down.
    ///
    /// Returns `None` only once shutdown has been triggered and no jobs
    /// remain; the caller should exit. A returned job counts as active
    /// until the [`ActiveJob`] is completed or dropped.
    pub fn dequeue(&self) -> Option<ActiveJob<'_>> {
        let guard = self.lock();
        let mut state = self
            .not_empty
            .wait_while(guard, |s| s.jobs.is_empty() && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);

        let job = state.jobs.pop_front()?;
        state.active += 1;
        let ordinal = state.claimed;
        state.claimed += 1;

        Some(ActiveJob {
            job,
            ordinal,
            queue: self,
        })
    }

    fn complete_one(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        if state.is_idle() {
            self.idle.notify_all();
        }
    }

    /// Block until no job is pending and no worker is active.
    ///
    /// The predicate is re-checked on every wake-up, so spurious wake-ups
    /// and completions that leave work behind keep the caller waiting.
    pub fn wait_idle(&self) {
        let guard = self.lock();
        let _state = self
            .idle
            .wait_while(guard, |s| !s.is_idle())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Mark the queue as shut down and wake every waiting worker.
    ///
    /// Workers drain any remaining jobs before observing the exit signal.
    pub fn trigger_shutdown(&self) {
        let mut state = self.lock();
        if state.shutdown {
            debug!("Shutdown already triggered");
            return;
        }
        state.shutdown = true;
        drop(state);

        // Every parked worker has to re-check the exit condition.
        self.not_empty.notify_all();
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.lock();
        QueueStatus {
            pending: state.jobs.len(),
            active: state.active,
            shutdown: state.shutdown,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A job claimed by a worker.
///
/// Dropping it (or calling [`ActiveJob::complete`]) releases the worker's
/// active slot and, if that leaves the queue idle, wakes the idle barrier.
/// Release happens even if the job panics.
#[derive(Debug)]
pub struct ActiveJob<'q> {
    job: Job,
    ordinal: u64,
    queue: &'q JobQueue,
}

impl ActiveJob<'_> {
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Position of this job in dequeue order, starting at 0
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Release the active slot
    pub fn complete(self) {}
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        self.queue.complete_one();
    }
}
