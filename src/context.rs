use crate::counters::CounterStore;
use crate::queue::JobQueue;
use crate::stats::StatsAggregator;
use crate::trace::RunClock;

/// State shared by the dispatcher and every worker for one run.
///
/// The queue carries the shutdown flag; counters and statistics each
/// guard themselves.
pub struct RunContext {
    pub queue: JobQueue,
    pub counters: CounterStore,
    pub stats: StatsAggregator,
    pub clock: RunClock,
}

impl RunContext {
    pub fn new(counters: CounterStore, clock: RunClock) -> Self {
        Self {
            queue: JobQueue::new(),
            counters,
            stats: StatsAggregator::new(),
            clock,
        }
    }
}
