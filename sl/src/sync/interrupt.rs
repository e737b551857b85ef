//! Cancellation tokens for blocked race participants

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::latch::Gate;

#[derive(Debug, Default)]
struct InterruptInner {
    raised: AtomicBool,
    parked_on: Mutex<Option<Arc<Gate>>>,
}

/// Per-participant interruption request
///
/// One participant (a runner or the judge) owns the token and passes it to
/// every blocking call it makes; clones let other threads interrupt it.
/// Raising is sticky: the status stays observable after the blocked call has
/// returned [`Interrupted`](crate::error::Interrupted).
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

impl Interrupt {
    /// Create a token that has not been raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the interrupt and wake the owner if it is parked
    ///
    /// Idempotent.
    pub fn interrupt(&self) {
        if !self.inner.raised.swap(true, Ordering::SeqCst) {
            debug!("Interrupt::interrupt: raised");
        }
        let gate = self.lock_parked().clone();
        if let Some(gate) = gate {
            gate.wake_all();
        }
    }

    /// Whether [`interrupt`](Self::interrupt) has been called
    pub fn is_interrupted(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Record the gate the owner is about to park on
    ///
    /// Must happen before the owner checks [`is_interrupted`](Self::is_interrupted)
    /// under the gate's lock, otherwise a concurrent interrupt could miss it.
    pub(super) fn park_on(&self, gate: &Arc<Gate>) -> Parked<'_> {
        *self.lock_parked() = Some(Arc::clone(gate));
        Parked { interrupt: self }
    }

    fn lock_parked(&self) -> MutexGuard<'_, Option<Arc<Gate>>> {
        self.inner.parked_on.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the parked gate when the blocking call returns
pub(super) struct Parked<'a> {
    interrupt: &'a Interrupt,
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        *self.interrupt.lock_parked() = None;
    }
}
