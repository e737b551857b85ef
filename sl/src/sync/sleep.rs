//! Interruptible sleep that never returns early

use std::time::{Duration, Instant};

use tracing::trace;

use super::interrupt::Interrupt;
use super::latch::CountDownLatch;
use crate::error::Interrupted;

/// Sleep for at least `duration` unless interrupted
///
/// The deadline is computed once on the monotonic clock; premature wakeups
/// just sleep again for whatever remains. A zero duration returns at once
/// without looking at the interrupt.
pub fn guarded_sleep(duration: Duration, interrupt: &Interrupt) -> Result<(), Interrupted> {
    if duration.is_zero() {
        return Ok(());
    }

    let deadline = Instant::now() + duration;
    // Nobody counts this down, it only gives the interrupt something to wake.
    let parking = CountDownLatch::new(1);

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        trace!(remaining = ?(deadline - now), "guarded_sleep: parking");
        parking.wait_timeout(deadline - now, interrupt)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_zero_duration_returns_immediately() {
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        assert_eq!(guarded_sleep(Duration::ZERO, &interrupt), Ok(()));
    }

    #[test]
    fn test_sleeps_at_least_duration() {
        let started = Instant::now();
        guarded_sleep(Duration::from_millis(30), &Interrupt::new()).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_already_interrupted() {
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        assert_eq!(guarded_sleep(Duration::from_secs(10), &interrupt), Err(Interrupted));
    }

    #[test]
    fn test_interrupt_cuts_sleep_short() {
        let interrupt = Interrupt::new();
        let started = Instant::now();
        thread::scope(|s| {
            let sleeper = s.spawn(|| guarded_sleep(Duration::from_secs(30), &interrupt));
            thread::sleep(Duration::from_millis(20));
            interrupt.interrupt();
            assert_eq!(sleeper.join().unwrap(), Err(Interrupted));
        });
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
