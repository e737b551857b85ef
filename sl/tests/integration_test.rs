//! Integration tests for startline
//!
//! These tests run real races on real threads. Timing-sensitive ones are
//! serialized so they do not compete with each other for the scheduler.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use serial_test::serial;
use startline::{
    Arrival, Interrupt, Judge, Naive, PrepareBarrier, ProtocolKind, RaceAborted, RaceProtocol, RunResult, Unified,
};

/// Wraps a protocol and records whether completion was ever reported before
/// every runner had called `runner_done`
struct Audited<P> {
    inner: P,
    done: AtomicUsize,
    premature: AtomicBool,
}

impl<P: RaceProtocol> Audited<P> {
    fn new(inner: P) -> Self {
        Self {
            inner,
            done: AtomicUsize::new(0),
            premature: AtomicBool::new(false),
        }
    }
}

impl<P: RaceProtocol> RaceProtocol for Audited<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn runner_count(&self) -> usize {
        self.inner.runner_count()
    }

    fn reset(&mut self) {
        self.done.store(0, Ordering::SeqCst);
        self.inner.reset();
    }

    fn runner_ready(&self, interrupt: &Interrupt) -> Result<Arrival, RaceAborted> {
        self.inner.runner_ready(interrupt)
    }

    fn fire_start(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        self.inner.fire_start(interrupt)
    }

    fn await_completion(&self, interrupt: &Interrupt) -> Result<(), RaceAborted> {
        self.inner.await_completion(interrupt)?;
        if self.done.load(Ordering::SeqCst) != self.inner.runner_count() {
            self.premature.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn runner_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.inner.runner_done();
    }
}

// =============================================================================
// Unified barrier
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_unified_never_misses_without_delays(runners in 1usize..40) {
        let mut judge = Judge::new(runners, 0, 0);
        let mut protocol = Unified::new(runners);
        prop_assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
    }

    #[test]
    fn test_unified_mutual_never_misses_without_delays(runners in 1usize..40) {
        let mut judge = Judge::new(runners, 0, 0);
        let mut protocol = Unified::mutual(runners);
        prop_assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
    }
}

#[test]
#[serial]
fn test_unified_never_misses_with_runner_delay() {
    let mut judge = Judge::new(16, 0, 20);
    let mut protocol = Unified::new(16);
    assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
}

#[test]
fn test_unified_back_to_back_races_are_isolated() {
    let mut judge = Judge::new(10, 0, 0);
    let mut protocol = Unified::new(10);
    for _ in 0..5 {
        // A start latch left open by the previous race would make every runner miss
        assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
    }
}

// =============================================================================
// Naive baseline
// =============================================================================

#[test]
#[serial]
fn test_naive_detect_runner_delay_misses_everyone() {
    let mut judge = Judge::new(8, 0, 100);
    let mut protocol = Naive::detecting(8);
    assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 8 });
}

#[test]
#[serial]
fn test_naive_blind_runner_delay_reports_nothing() {
    let mut judge = Judge::new(8, 0, 50);
    let mut protocol = Naive::new(8);
    // Everyone is late, but nobody can tell
    assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
}

#[test]
#[serial]
fn test_naive_reset_isolates_races() {
    let mut protocol = Naive::detecting(4);

    let mut late_runners = Judge::new(4, 0, 100);
    assert_eq!(late_runners.start(&mut protocol), RunResult::Completed { missed: 4 });

    // The start fired last race; only a fresh latch lets runners wait for this one
    let mut patient_judge = Judge::new(4, 200, 0);
    assert_eq!(patient_judge.start(&mut protocol), RunResult::Completed { missed: 0 });
}

#[test]
#[serial]
fn test_naive_detect_misses_more_without_judge_delay() {
    const ROUNDS: usize = 20;
    let mut protocol = Naive::detecting(50);

    let mut total_missed = |judge: &mut Judge| -> usize {
        (0..ROUNDS)
            .map(|_| match judge.start(&mut protocol) {
                RunResult::Completed { missed } => missed,
                RunResult::Aborted => panic!("race should not abort"),
            })
            .sum()
    };

    let judge_delay_missed = total_missed(&mut Judge::new(50, 10, 0));
    let no_delays_missed = total_missed(&mut Judge::new(50, 0, 0));

    // Single rounds are noisy, the totals are not
    assert!(no_delays_missed > 0, "firing at once should leave some runners behind");
    assert!(
        judge_delay_missed < no_delays_missed,
        "judge delay missed {judge_delay_missed}, no delays missed {no_delays_missed}"
    );
}

// =============================================================================
// Prepare barrier
// =============================================================================

#[test]
#[serial]
fn test_prepare_completion_waits_for_every_runner() {
    let mut protocol = Audited::new(PrepareBarrier::new(24));
    for (judge_delay, runner_delay) in [(0, 0), (10, 0), (0, 10)] {
        let mut judge = Judge::new(24, judge_delay, runner_delay);
        let result = judge.start(&mut protocol);
        assert!(matches!(result, RunResult::Completed { .. }), "{result:?}");
        assert!(!protocol.premature.load(Ordering::SeqCst));
    }
}

#[test]
#[serial]
fn test_prepare_waits_for_late_runners() {
    let mut naive = Naive::detecting(24);
    let mut prepare = PrepareBarrier::new(24);
    let mut judge = Judge::new(24, 0, 50);

    assert_eq!(judge.start(&mut naive), RunResult::Completed { missed: 24 });
    // Only runners overtaken right after counting down prepare can miss
    match judge.start(&mut prepare) {
        RunResult::Completed { missed } => assert!(missed < 24, "prepare missed {missed}"),
        RunResult::Aborted => panic!("race should not abort"),
    }
}

#[test]
#[serial]
fn test_completion_ordering_holds_for_every_kind() {
    for kind in ProtocolKind::ALL {
        let mut protocol = Audited::new(kind.build(12));
        let mut judge = Judge::new(12, 0, 0);
        let result = judge.start(&mut protocol);
        assert!(!result.is_aborted(), "{} aborted", kind);
        assert!(!protocol.premature.load(Ordering::SeqCst), "{} completed early", kind);
    }
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_interrupted_runner_aborts_race_and_blocks_restart() {
    let mut judge = Judge::new(4, 10_000, 0);
    let handle = judge.abort_handle();
    let mut protocol = Naive::detecting(4);
    let started = Instant::now();

    let result = thread::scope(|s| {
        s.spawn(|| {
            // Runners block in runner_ready while the judge sleeps
            while !handle.interrupt_runner(0) {
                thread::sleep(Duration::from_millis(1));
            }
        });
        judge.start(&mut protocol)
    });

    assert_eq!(result, RunResult::Aborted);
    assert!(judge.was_aborted());
    assert!(started.elapsed() < Duration::from_secs(10), "judge slept through the abort");

    let restart = panic::catch_unwind(AssertUnwindSafe(|| judge.start(&mut protocol)));
    assert!(restart.is_err(), "restarting an aborted judge must panic");
}

#[test]
fn test_interrupt_during_runner_delay_aborts() {
    let mut judge = Judge::new(3, 0, 10_000);
    let handle = judge.abort_handle();
    let mut protocol = Unified::new(3);
    let started = Instant::now();

    let result = thread::scope(|s| {
        s.spawn(|| {
            while !handle.interrupt_all() {
                thread::sleep(Duration::from_millis(1));
            }
        });
        judge.start(&mut protocol)
    });

    assert_eq!(result, RunResult::Aborted);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_interrupted_prepare_judge_aborts() {
    // Runners take forever, so the judge is stuck waiting on prepare
    let mut judge = Judge::new(2, 0, 10_000);
    let handle = judge.abort_handle();
    let mut protocol = PrepareBarrier::new(2);

    let result = thread::scope(|s| {
        s.spawn(|| {
            while !handle.interrupt_judge() {
                thread::sleep(Duration::from_millis(1));
            }
        });
        judge.start(&mut protocol)
    });

    assert_eq!(result, RunResult::Aborted);
    assert!(!handle.is_racing());
}

#[test]
fn test_other_judges_unaffected_by_abort() {
    let mut protocol = Unified::new(2);

    let mut aborted = Judge::new(2, 10_000, 0);
    let handle = aborted.abort_handle();
    let result = thread::scope(|s| {
        s.spawn(|| {
            while !handle.interrupt_judge() {
                thread::sleep(Duration::from_millis(1));
            }
        });
        aborted.start(&mut protocol)
    });
    assert_eq!(result, RunResult::Aborted);

    // The protocol is reset before every race, so a fresh judge can reuse it
    let mut fresh = Judge::new(2, 0, 0);
    assert_eq!(fresh.start(&mut protocol), RunResult::Completed { missed: 0 });
}
