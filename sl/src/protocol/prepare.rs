//! Naive protocol plus a prepare latch the judge waits on

use tracing::debug;

use super::{Arrival, RaceProtocol, detect_then_await, runner_latch_count};
use crate::error::RaceAborted;
use crate::sync::{CountDownLatch, Interrupt};

#[derive(Debug)]
struct Barriers {
    prepare: CountDownLatch,
    start: CountDownLatch,
    done: CountDownLatch,
}

impl Barriers {
    fn new(runner_count: usize) -> Self {
        Self {
            prepare: CountDownLatch::new(runner_count as u64),
            start: CountDownLatch::new(1),
            done: CountDownLatch::new(runner_count as u64),
        }
    }
}

/// The judge may not fire until every runner has counted down `prepare`
///
/// The last runner to count down `prepare` can still be overtaken: the judge
/// wakes and fires before that runner gets to look at `start`, so it reports a
/// missed start even though it was at the line. Those false positives are
/// kept, they are what [`Unified`](super::Unified) does better.
#[derive(Debug)]
pub struct PrepareBarrier {
    runner_count: usize,
    barriers: Barriers,
}

impl PrepareBarrier {
    /// Prepare and done latches of `runner_count`, start latch of one
    pub fn new(runner_count: usize) -> Self {
        debug!(runner_count, "PrepareBarrier::new: called");
        runner_latch_count(runner_count);
        Self {
            runner_count,
            barriers: Barriers::new(runner_count),
        }
    }
}

impl RaceProtocol for PrepareBarrier {
    fn name(&self) -> &'static str {
        "PrepareBarrier"
    }

    fn runner_count(&self) -> usize {
        self.runner_count
    }

    fn reset(&mut self) {
        debug!(runner_count = self.runner_count, "PrepareBarrier::reset: called");
        self.barriers = Barriers::new(self.runner_count);
    }

    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
        self.barriers.prepare.count_down();
        detect_then_await(&self.barriers.start, interrupt)
    }

    fn fire_start(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        debug!("PrepareBarrier::fire_start: waiting for runners to prepare");
        self.barriers.prepare.wait(interrupt)?;
        debug!("PrepareBarrier::fire_start: all prepared, firing");
        self.barriers.start.count_down();
        Ok(())
    }

    fn await_completion(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        self.barriers.done.wait(interrupt)?;
        Ok(())
    }

    fn runner_done(&self) {
        self.barriers.done.count_down();
    }
}
