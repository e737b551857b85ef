//! Run-scoped state shared between the judge, its runners and abort handles

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::sync::Interrupt;

/// Interrupt tokens for everyone taking part in the current race
#[derive(Debug, Clone)]
pub(crate) struct Participants {
    pub judge: Interrupt,
    pub runners: Vec<Interrupt>,
}

impl Participants {
    fn new(runner_count: usize) -> Self {
        Self {
            judge: Interrupt::new(),
            runners: (0..runner_count).map(|_| Interrupt::new()).collect(),
        }
    }

    fn interrupt_all(&self) {
        self.judge.interrupt();
        for runner in &self.runners {
            runner.interrupt();
        }
    }
}

/// Missed-start tally and abort flag for one race at a time
#[derive(Debug, Default)]
pub(crate) struct RaceControl {
    missed: AtomicUsize,
    interrupted: AtomicBool,
    participants: Mutex<Option<Participants>>,
}

impl RaceControl {
    /// Clear the tally and flag and hand out fresh tokens for a new race
    pub fn begin(&self, runner_count: usize) -> Participants {
        debug!(runner_count, "RaceControl::begin: called");
        self.missed.store(0, Ordering::SeqCst);
        self.interrupted.store(false, Ordering::SeqCst);
        let participants = Participants::new(runner_count);
        *self.lock_participants() = Some(participants.clone());
        participants
    }

    /// Forget the finished race's tokens
    pub fn finish(&self) {
        debug!("RaceControl::finish: called");
        *self.lock_participants() = None;
    }

    /// Count one more missed start, returning the new total
    pub fn record_missed(&self) -> usize {
        self.missed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn missed(&self) -> usize {
        self.missed.load(Ordering::SeqCst)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Mark the race aborted and interrupt every participant
    ///
    /// The flag flips once no matter how many participants observe the
    /// cancellation. Interrupting the rest unblocks the judge and the other
    /// runners so the runner threads can be joined.
    pub fn abort(&self) {
        if !self.interrupted.swap(true, Ordering::SeqCst) {
            warn!("RaceControl::abort: race aborted, interrupting all participants");
        }
        self.with_live_race(|p| {
            p.interrupt_all();
            true
        });
    }

    /// Run `f` on the live race's participants; false when no race is running
    pub fn with_live_race(&self, f: impl FnOnce(&Participants) -> bool) -> bool {
        let participants = self.lock_participants().clone();
        match participants {
            Some(participants) => f(&participants),
            None => false,
        }
    }

    fn lock_participants(&self) -> MutexGuard<'_, Option<Participants>> {
        self.participants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delivers cancellation into a judge's races from another thread
///
/// Interrupting a single participant only unblocks that participant; once it
/// observes the interrupt the whole race is aborted. A participant past its
/// last blocking call never observes it, and the race still completes.
///
/// Every method returns whether the interrupt was delivered while a race was
/// live, not whether anyone observed it.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    pub(crate) control: Arc<RaceControl>,
}

impl AbortHandle {
    /// Interrupt runner `index` of the current race
    ///
    /// False when no race is live or `index` is out of range.
    pub fn interrupt_runner(&self, index: usize) -> bool {
        debug!(index, "AbortHandle::interrupt_runner: called");
        self.control.with_live_race(|p| match p.runners.get(index) {
            Some(runner) => {
                runner.interrupt();
                true
            }
            None => false,
        })
    }

    /// Interrupt the judge of the current race
    pub fn interrupt_judge(&self) -> bool {
        debug!("AbortHandle::interrupt_judge: called");
        self.control.with_live_race(|p| {
            p.judge.interrupt();
            true
        })
    }

    /// Interrupt the judge and every runner of the current race
    pub fn interrupt_all(&self) -> bool {
        debug!("AbortHandle::interrupt_all: called");
        self.control.with_live_race(|p| {
            p.interrupt_all();
            true
        })
    }

    /// Whether a race is currently running
    pub fn is_racing(&self) -> bool {
        self.control.with_live_race(|_| true)
    }
}
