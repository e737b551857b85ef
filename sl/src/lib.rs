//! Startline - what happens at the starting line of a countdown-latch race
//!
//! A judge thread spawns a fixed number of runner threads, fires a start
//! signal and waits for every runner to finish. The textbook two-latch pattern
//! only guarantees nobody starts *before* the signal; runners that the OS has
//! not scheduled yet can still arrive *after* it and never wait at all. This
//! crate runs that pattern next to two protocols that close the gap and counts
//! the runners that missed their start.
//!
//! # Modules
//!
//! - [`sync`] - countdown latch, interrupts and guarded sleep
//! - [`protocol`] - the [`RaceProtocol`] trait and its three variants
//! - [`judge`] - the race orchestrator
//! - [`scenario`] - delay profiles and the protocol × scenario matrix
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```
//! use startline::{Judge, RunResult, Unified};
//!
//! let mut judge = Judge::new(8, 0, 0);
//! let mut protocol = Unified::new(8);
//! assert_eq!(judge.start(&mut protocol), RunResult::Completed { missed: 0 });
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod judge;
pub mod protocol;
pub mod scenario;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use error::{Interrupted, RaceAborted};
pub use judge::{AbortHandle, Judge, RunResult};
pub use protocol::{Arrival, Detection, Naive, PrepareBarrier, ProtocolKind, RaceProtocol, Unified};
pub use scenario::{MatrixPlan, RoundOutcome, Scenario, ScenarioKind, ScenarioReport, Summary, run_matrix};
pub use sync::{CountDownLatch, Interrupt, guarded_sleep};
