//! Error types for race coordination

use thiserror::Error;

/// A blocking operation was cancelled through its participant's [`Interrupt`](crate::sync::Interrupt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Interrupted while blocked")]
pub struct Interrupted;

/// A race participant observed cancellation and gave up on the race
///
/// Never retried: the barrier states of the race it escaped from are no
/// longer consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Race aborted: a participant was interrupted")]
pub struct RaceAborted;

impl From<Interrupted> for RaceAborted {
    fn from(_: Interrupted) -> Self {
        RaceAborted
    }
}
