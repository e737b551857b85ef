//! The textbook start/done latch pair

use tracing::debug;

use super::{Arrival, RaceProtocol, detect_then_await, runner_latch_count};
use crate::error::RaceAborted;
use crate::sync::{CountDownLatch, Interrupt};

/// Whether runners look at the start latch before waiting on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Wait blindly; a late runner returns at once and never knows
    Disabled,
    /// Report [`Arrival::MissedStart`] when the start is already open
    Enabled,
}

#[derive(Debug)]
struct Barriers {
    start: CountDownLatch,
    done: CountDownLatch,
}

impl Barriers {
    fn new(runner_count: usize) -> Self {
        Self {
            start: CountDownLatch::new(1),
            done: CountDownLatch::new(runner_count as u64),
        }
    }
}

/// Start latch of one plus done latch of `runner_count`
///
/// Nothing makes the judge wait for runners to reach the line, so under real
/// scheduling latency some or all of them arrive after the start has fired.
#[derive(Debug)]
pub struct Naive {
    runner_count: usize,
    detection: Detection,
    barriers: Barriers,
}

impl Naive {
    /// The blind flavor
    pub fn new(runner_count: usize) -> Self {
        Self::with_detection(runner_count, Detection::Disabled)
    }

    /// The flavor that reports missed starts
    pub fn detecting(runner_count: usize) -> Self {
        Self::with_detection(runner_count, Detection::Enabled)
    }

    /// Either flavor, chosen by `detection`
    pub fn with_detection(runner_count: usize, detection: Detection) -> Self {
        debug!(runner_count, ?detection, "Naive::with_detection: called");
        runner_latch_count(runner_count);
        Self {
            runner_count,
            detection,
            barriers: Barriers::new(runner_count),
        }
    }

    /// Which flavor this instance is
    pub fn detection(&self) -> Detection {
        self.detection
    }
}

impl RaceProtocol for Naive {
    fn name(&self) -> &'static str {
        match self.detection {
            Detection::Disabled => "Naive",
            Detection::Enabled => "NaiveDetect",
        }
    }

    fn runner_count(&self) -> usize {
        self.runner_count
    }

    fn reset(&mut self) {
        debug!(runner_count = self.runner_count, "Naive::reset: called");
        self.barriers = Barriers::new(self.runner_count);
    }

    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
        match self.detection {
            Detection::Disabled => {
                self.barriers.start.wait(interrupt)?;
                Ok(Arrival::OnTime)
            }
            Detection::Enabled => detect_then_await(&self.barriers.start, interrupt),
        }
    }

    fn fire_start(&self, _interrupt: &Interrupt) -> Result<(), RaceAborted> {
        debug!("Naive::fire_start: called");
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
