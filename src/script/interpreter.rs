use super::{Script, Step};
use crate::counters::CounterStore;
use std::thread;
use tracing::warn;

/// What a single script run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecSummary {
    pub increments: u64,
    pub decrements: u64,
    pub sleeps: u64,
    /// Counter updates dropped because the id was outside the store
    pub skipped: u64,
}

/// Executes scripts on the calling thread against a counter store
pub struct Interpreter<'a> {
    counters: &'a CounterStore,
}

impl<'a> Interpreter<'a> {
    pub fn new(counters: &'a CounterStore) -> Self {
        Self { counters }
    }

    /// Run every step of `script` in order
    pub fn run(&self, script: &Script) -> ExecSummary {
        let mut summary = ExecSummary::default();
        self.run_steps(script.steps(), &mut summary);
        summary
    }

    fn run_steps(&self, steps: &[Step], summary: &mut ExecSummary) {
        for step in steps {
            match step {
                Step::Sleep(duration) => {
                    // Only this worker sleeps; no lock is held here.
                    thread::sleep(*duration);
                    summary.sleeps += 1;
                }
                Step::Increment(id) => match self.counters.increment(*id) {
                    Ok(_) => summary.increments += 1,
                    Err(e) => {
                        warn!(counter = *id, error = %e, "Skipping increment");
                        summary.skipped += 1;
                    }
                },
                Step::Decrement(id) => match self.counters.decrement(*id) {
                    Ok(_) => summary.decrements += 1,
                    Err(e) => {
                        warn!(counter = *id, error = %e, "Skipping decrement");
                        summary.skipped += 1;
                    }
                },
                Step::Repeat { times, body } => {
                    for _ in 0..*times {
                        self.run_steps(body.steps(), summary);
                    }
                }
            }
        }
    }
}
