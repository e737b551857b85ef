//! One start latch shared by the runners and the judge

use tracing::debug;

use super::{Arrival, RaceProtocol, runner_latch_count};
use crate::error::RaceAborted;
use crate::sync::{CountDownLatch, Interrupt};

#[derive(Debug)]
struct Barriers {
    start: CountDownLatch,
    done: CountDownLatch,
}

impl Barriers {
    fn new(runner_count: usize) -> Self {
        let runners = runner_latch_count(runner_count);
        Self {
            // every runner plus the judge
            start: CountDownLatch::new(runners + 1),
            done: CountDownLatch::new(runners),
        }
    }
}

/// Start latch sized `runner_count + 1`
///
/// Each runner counts down `start` on arrival and then waits on it, the judge
/// counts it down to fire. The latch only opens once every participant has
/// arrived, so a runner can never find it already open: exactly
/// `runner_count + 1` count-downs happen per race.
#[derive(Debug)]
pub struct Unified {
    runner_count: usize,
    mutual: bool,
    barriers: Barriers,
}

impl Unified {
    /// The judge fires without waiting for the start itself
    pub fn new(runner_count: usize) -> Self {
        debug!(runner_count, "Unified::new: called");
        Self {
            runner_count,
            mutual: false,
            barriers: Barriers::new(runner_count),
        }
    }

    /// The judge also blocks on `start` after firing, rendezvousing with every runner
    pub fn mutual(runner_count: usize) -> Self {
        debug!(runner_count, "Unified::mutual: called");
        Self {
            mutual: true,
            ..Self::new(runner_count)
        }
    }

    pub fn is_mutual(&self) -> bool {
        self.mutual
    }
}

impl RaceProtocol for Unified {
    fn name(&self) -> &'static str {
        if self.mutual { "UnifiedMutual" } else { "Unified" }
    }

    fn runner_count(&self) -> usize {
        self.runner_count
    }

    fn reset(&mut self) {
        debug!(runner_count = self.runner_count, "Unified::reset: called");
        self.barriers = Barriers::new(self.runner_count);
    }

    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
        let start = &self.barriers.start;
        if start.count() == 0 {
            return Ok(Arrival::MissedStart);
        }
        start.count_down();
        start.wait(interrupt)?;
        Ok(Arrival::OnTime)
    }

    fn fire_start(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        debug!(mutual = self.mutual, "Unified::fire_start: called");
        self.barriers.start.count_down();
        if self.mutual {
            self.barriers.start.wait(interrupt)?;
        }
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
