//! Judge - spawns the runners, fires the start and counts missed starts
//!
//! One [`Judge`] holds a fixed runner count and two artificial delays. Each
//! call to [`Judge::start`] is one race:
//!
//! 1. reset the tally, the abort flag and the protocol
//! 2. spawn one named thread per runner
//! 3. sleep for the judge delay, fire the start, wait for completion
//! 4. join the runners and report [`RunResult`]
//!
//! Runners sleep for the runner delay, then call `runner_ready` (counting a
//! missed start if they were late) and `runner_done`. Whoever observes a
//! cancellation aborts the whole race; a judge that has aborted refuses to
//! race again.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::RaceAborted;
use crate::protocol::{Arrival, RaceProtocol};
use crate::sync::{Interrupt, guarded_sleep};

mod control;

pub use control::AbortHandle;
use control::{Participants, RaceControl};

/// Outcome of one race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RunResult {
    /// Every runner finished; `missed` of them arrived after the start
    Completed { missed: usize },
    /// Some participant was interrupted before the race finished
    Aborted,
}

impl RunResult {
    /// Missed starts of a completed race
    pub fn missed(&self) -> Option<usize> {
        match self {
            RunResult::Completed { missed } => Some(*missed),
            RunResult::Aborted => None,
        }
    }

    /// Whether the race was aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunResult::Aborted)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunResult::Completed { missed } => write!(f, "Amount of runners (threads) that missed their start: {}", missed),
            RunResult::Aborted => write!(f, "Race failure. A participant was interrupted before the race completed."),
        }
    }
}

/// Coordinator of races between a fixed number of runner threads
pub struct Judge {
    runner_count: usize,
    judge_delay: Duration,
    runner_delay: Duration,
    control: Arc<RaceControl>,
}

impl Judge {
    /// Create a judge; delays are in milliseconds, zero means no delay
    pub fn new(runner_count: usize, judge_delay_ms: u64, runner_delay_ms: u64) -> Self {
        debug!(runner_count, judge_delay_ms, runner_delay_ms, "Judge::new: called");
        Self {
            runner_count,
            judge_delay: Duration::from_millis(judge_delay_ms),
            runner_delay: Duration::from_millis(runner_delay_ms),
            control: Arc::new(RaceControl::default()),
        }
    }

    /// Runner threads spawned per race
    pub fn runner_count(&self) -> usize {
        self.runner_count
    }

    /// Pause before the judge fires the start
    pub fn judge_delay(&self) -> Duration {
        self.judge_delay
    }

    /// Pause before each runner heads to the line
    pub fn runner_delay(&self) -> Duration {
        self.runner_delay
    }

    /// Handle for interrupting this judge's races from another thread
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            control: Arc::clone(&self.control),
        }
    }

    /// Whether the last race was aborted
    pub fn was_aborted(&self) -> bool {
        self.control.is_interrupted()
    }

    /// Run one race with `protocol`
    ///
    /// # Panics
    ///
    /// If the previous race on this judge was aborted, or if the protocol was
    /// built for a different number of runners.
    pub fn start(&mut self, protocol: &mut dyn RaceProtocol) -> RunResult {
        assert!(
            !self.was_aborted(),
            "Restarting a previously interrupted race could produce undesirable results"
        );
        assert_eq!(
            protocol.runner_count(),
            self.runner_count,
            "{} expects a different number of runners than this judge spawns",
            protocol.name()
        );

        info!(
            "Running {} using amount of runners: {}, judge delay: {} (ms), runner delay: {} (ms)",
            protocol.name(),
            self.runner_count,
            self.judge_delay.as_millis(),
            self.runner_delay.as_millis()
        );

        let participants = self.control.begin(self.runner_count);
        protocol.reset();
        self.execute(&*protocol, participants);
        self.control.finish();

        let result = if self.control.is_interrupted() {
            RunResult::Aborted
        } else {
            RunResult::Completed {
                missed: self.control.missed(),
            }
        };

        match result {
            RunResult::Completed { missed } => info!(protocol = protocol.name(), missed, "Judge::start: {}", result),
            RunResult::Aborted => warn!(protocol = protocol.name(), "Judge::start: {}", result),
        }
        result
    }

    fn execute(&self, protocol: &dyn RaceProtocol, participants: Participants) {
        let Participants { judge, runners } = participants;
        let control: &RaceControl = &self.control;
        let runner_delay = self.runner_delay;

        thread::scope(|s| {
            for (index, interrupt) in runners.into_iter().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("runner-{}", index))
                    .spawn_scoped(s, move || run_runner(index, protocol, control, runner_delay, &interrupt));
                if let Err(e) = spawned {
                    error!(index, error = %e, "Judge::execute: failed to spawn runner");
                    control.abort();
                    return;
                }
            }

            if self.officiate(protocol, &judge).is_err() {
                debug!("Judge::execute: judge aborted");
                control.abort();
            }
        });
        debug!("Judge::execute: all runners joined");
    }

    fn officiate(&self, protocol: &dyn RaceProtocol, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        guarded_sleep(self.judge_delay, interrupt)?;
        protocol.fire_start(interrupt)?;
        protocol.await_completion(interrupt)
    }
}

fn run_runner(index: usize, protocol: &dyn RaceProtocol, control: &RaceControl, delay: Duration, interrupt: &Interrupt) {
    if guarded_sleep(delay, interrupt).is_err() {
        debug!(index, "run_runner: interrupted during delay");
        control.abort();
        return;
    }

    match protocol.runner_ready(interrupt) {
        Ok(Arrival::OnTime) => {}
        Ok(Arrival::MissedStart) => {
            let missed = control.record_missed();
            debug!(index, missed, "run_runner: missed the start");
        }
        Err(RaceAborted) => {
            debug!(index, "run_runner: interrupted at the starting line");
            control.abort();
            return;
        }
    }

    protocol.runner_done();
}
