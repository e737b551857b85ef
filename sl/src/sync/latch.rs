//! Countdown latch with interruptible waits

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::trace;

use super::interrupt::Interrupt;
use crate::error::Interrupted;

/// Count plus condition variable, shared with any [`Interrupt`] that has to
/// wake a participant parked on it
#[derive(Debug)]
pub(super) struct Gate {
    count: Mutex<u64>,
    cond: Condvar,
}

impl Gate {
    fn new(count: u64) -> Self {
        Self {
            count: Mutex::new(count),
            cond: Condvar::new(),
        }
    }

    // No critical section can panic, a poisoned count is still accurate.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every waiter so it re-checks its interrupt
    ///
    /// Taking the lock first closes the window between a waiter checking its
    /// interrupt and parking on the condition variable.
    pub(super) fn wake_all(&self) {
        let _count = self.lock();
        self.cond.notify_all();
    }
}

/// A blocking counter initialized to a positive count
///
/// Exactly `count` calls to [`count_down`](Self::count_down), from any threads,
/// bring it to zero. Waiters block until then and return immediately once it
/// is zero. Counting down past zero does nothing.
#[derive(Debug)]
pub struct CountDownLatch {
    gate: Arc<Gate>,
}

impl CountDownLatch {
    /// Create a latch that opens after `count` count-downs
    pub fn new(count: u64) -> Self {
        trace!(count, "CountDownLatch::new: called");
        Self {
            gate: Arc::new(Gate::new(count)),
        }
    }

    /// Decrement the count, releasing all waiters on the transition to zero
    pub fn count_down(&self) {
        let mut count = self.gate.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            trace!("CountDownLatch::count_down: reached zero, waking waiters");
            self.gate.cond.notify_all();
        }
    }

    /// Current count
    pub fn count(&self) -> u64 {
        *self.gate.lock()
    }

    /// Block until the count reaches zero
    ///
    /// The interrupt is checked first, so an already-interrupted participant
    /// gets [`Interrupted`] even from an open latch.
    pub fn wait(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        let _parked = interrupt.park_on(&self.gate);
        let mut count = self.gate.lock();
        loop {
            if interrupt.is_interrupted() {
                trace!("CountDownLatch::wait: interrupted");
                return Err(Interrupted);
            }
            if *count == 0 {
                return Ok(());
            }
            count = self.gate.cond.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the count reaches zero or roughly `timeout` passes
    ///
    /// Returns whether the latch is open. Like [`Condvar::wait_timeout`] this
    /// may return early on a spurious wakeup; loop on a deadline when the full
    /// duration matters (see [`guarded_sleep`](super::guarded_sleep)).
    pub fn wait_timeout(&self, timeout: Duration, interrupt: &Interrupt) -> Result<bool, Interrupted> {
        let _parked = interrupt.park_on(&self.gate);
        let count = self.gate.lock();
        if interrupt.is_interrupted() {
            return Err(Interrupted);
        }
        if *count == 0 {
            return Ok(true);
        }
        let (count, _) = self
            .gate
            .cond
            .wait_timeout(count, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        if interrupt.is_interrupted() {
            return Err(Interrupted);
        }
        Ok(*count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_count_down_to_zero() {
        let latch = CountDownLatch::new(3);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 1);
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_count_down_past_zero_is_noop() {
        let latch = CountDownLatch::new(1);
        latch.count_down();
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_wait_on_open_latch_returns_immediately() {
        let latch = CountDownLatch::new(0);
        assert_eq!(latch.wait(&Interrupt::new()), Ok(()));
    }

    #[test]
    fn test_wait_releases_all_waiters() {
        let latch = CountDownLatch::new(2);
        thread::scope(|s| {
            let waiters: Vec<_> = (0..4)
                .map(|_| s.spawn(|| latch.wait(&Interrupt::new())))
                .collect();

            thread::sleep(Duration::from_millis(20));
            latch.count_down();
            latch.count_down();

            for waiter in waiters {
                assert_eq!(waiter.join().unwrap(), Ok(()));
            }
        });
    }

    #[test]
    fn test_wait_checks_interrupt_before_count() {
        let latch = CountDownLatch::new(0);
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        assert_eq!(latch.wait(&interrupt), Err(Interrupted));
    }

    #[test]
    fn test_interrupt_unblocks_waiter() {
        let latch = CountDownLatch::new(1);
        let interrupt = Interrupt::new();
        thread::scope(|s| {
            let waiter = s.spawn(|| latch.wait(&interrupt));
            thread::sleep(Duration::from_millis(20));
            interrupt.interrupt();
            assert_eq!(waiter.join().unwrap(), Err(Interrupted));
        });
        // The latch itself is untouched
        assert_eq!(latch.count(), 1);
    }

    #[test]
    fn test_wait_timeout_reports_closed_latch() {
        let latch = CountDownLatch::new(1);
        let opened = latch.wait_timeout(Duration::from_millis(5), &Interrupt::new());
        assert_eq!(opened, Ok(false));
    }

    #[test]
    fn test_wait_timeout_reports_open_latch() {
        let latch = CountDownLatch::new(1);
        latch.count_down();
        let opened = latch.wait_timeout(Duration::from_secs(5), &Interrupt::new());
        assert_eq!(opened, Ok(true));
    }
}
