//! Race protocols - how runners and the judge meet at the starting line
//!
//! Every protocol is built from [`CountDownLatch`]es only. They differ in who
//! counts down what before the start signal can fire:
//!
//! - [`Naive`] - the textbook two-latch pattern. The judge may fire before any
//!   runner has arrived.
//! - [`PrepareBarrier`] - the judge first waits on a third latch that every
//!   runner counts down on the way to the line. Occasionally reports a false
//!   missed start.
//! - [`Unified`] - runners and the judge all count down the same start latch,
//!   which cannot open until everybody is at the line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RaceAborted;
use crate::sync::{CountDownLatch, Interrupt};

mod naive;
mod prepare;
mod unified;

pub use naive::{Detection, Naive};
pub use prepare::PrepareBarrier;
pub use unified::Unified;

/// What a runner found when it reached the starting line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The runner was at the line when the start fired
    OnTime,
    /// The start had already fired when the runner got to the line
    MissedStart,
}

/// Rules for one race between `runner_count` runners and a judge
///
/// A race is: [`reset`](Self::reset), then concurrently every runner calls
/// [`runner_ready`](Self::runner_ready) followed by
/// [`runner_done`](Self::runner_done) while the judge calls
/// [`fire_start`](Self::fire_start) once followed by
/// [`await_completion`](Self::await_completion). Blocking calls take the
/// caller's [`Interrupt`] and give up with [`RaceAborted`] when it is raised.
pub trait RaceProtocol: Send + Sync {
    /// Short human-readable name
    fn name(&self) -> &'static str;

    /// Number of runners every race on this instance expects
    fn runner_count(&self) -> usize;

    /// Replace all barriers with fresh ones at their starting counts
    fn reset(&mut self);

    /// A runner reached the starting line; may block until the start fires
    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted>;

    /// The judge fires the start signal
    fn fire_start(&self, interrupt: &Interrupt) -> Result<(), RaceAborted>;

    /// The judge waits until every runner called [`runner_done`](Self::runner_done)
    fn await_completion(&self, interrupt: &Interrupt) -> Result<(), RaceAborted>;

    /// A runner crossed the finish line. Never blocks.
    fn runner_done(&self);
}

impl<P: RaceProtocol + ?Sized> RaceProtocol for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn runner_count(&self) -> usize {
        (**self).runner_count()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
        (**self).runner_ready(interrupt)
    }

    fn fire_start(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        (**self).fire_start(interrupt)
    }

    fn await_completion(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        (**self).await_completion(interrupt)
    }

    fn runner_done(&self) {
        (**self).runner_done()
    }
}

/// Report a missed start if `start` has already opened, otherwise wait for it
///
/// Waiting on an open latch would return at once anyway, which is exactly how
/// a late runner can't tell it was late unless it looks first.
pub(crate) fn detect_then_await(start: &CountDownLatch, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
    if start.count() == 0 {
        return Ok(Arrival::MissedStart);
    }
    start.wait(interrupt)?;
    Ok(Arrival::OnTime)
}

/// Latch count for `runner_count` runners
///
/// Panics on zero: a race without runners is a usage error.
pub(crate) fn runner_latch_count(runner_count: usize) -> u64 {
    assert!(runner_count > 0, "a race needs at least one runner");
    runner_count as u64
}

/// Selectable protocol variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    /// Two latches, runners never learn they were late
    Naive,
    /// Two latches, runners check the start before waiting
    NaiveDetect,
    /// Adds a prepare latch the judge waits on before firing
    Prepare,
    /// Runners and judge share a start latch of `runners + 1`
    Unified,
    /// Like `Unified` but the judge also waits on the start latch
    UnifiedMutual,
}

impl ProtocolKind {
    /// Every variant, baseline first
    pub const ALL: [ProtocolKind; 5] = [
        ProtocolKind::Naive,
        ProtocolKind::NaiveDetect,
        ProtocolKind::Prepare,
        ProtocolKind::Unified,
        ProtocolKind::UnifiedMutual,
    ];

    /// Construct a protocol of this kind for `runner_count` runners
    pub fn build(self, runner_count: usize) -> Box<dyn RaceProtocol> {
        debug!(kind = %self, runner_count, "ProtocolKind::build: called");
        match self {
            ProtocolKind::Naive => Box::new(Naive::new(runner_count)),
            ProtocolKind::NaiveDetect => Box::new(Naive::detecting(runner_count)),
            ProtocolKind::Prepare => Box::new(PrepareBarrier::new(runner_count)),
            ProtocolKind::Unified => Box::new(Unified::new(runner_count)),
            ProtocolKind::UnifiedMutual => Box::new(Unified::mutual(runner_count)),
        }
    }

    /// One-line description for listings
    pub fn description(self) -> &'static str {
        match self {
            ProtocolKind::Naive => "start(1) + done(n); runners wait blindly, late arrivals go unnoticed",
            ProtocolKind::NaiveDetect => "start(1) + done(n); runners report a missed start if start is already open",
            ProtocolKind::Prepare => "adds prepare(n) the judge awaits before firing; rare false missed starts",
            ProtocolKind::Unified => "start(n + 1) counted down by every runner and the judge",
            ProtocolKind::UnifiedMutual => "start(n + 1) and the judge also waits on it after firing",
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "ProtocolKind::from_str: called");
        match s.to_lowercase().as_str() {
            "naive" | "erroneous" => Ok(Self::Naive),
            "naive-detect" | "detect" => Ok(Self::NaiveDetect),
            "prepare" | "prepare-barrier" => Ok(Self::Prepare),
            "unified" | "unified-barrier" => Ok(Self::Unified),
            "unified-mutual" | "mutual" => Ok(Self::UnifiedMutual),
            _ => Err(format!(
                "Unknown protocol: {}. Use: naive, naive-detect, prepare, unified, or unified-mutual",
                s
            )),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Naive => "naive",
            ProtocolKind::NaiveDetect => "naive-detect",
            ProtocolKind::Prepare => "prepare",
            ProtocolKind::Unified => "unified",
            ProtocolKind::UnifiedMutual => "unified-mutual",
        };
        write!(f, "{}", name)
    }
}
