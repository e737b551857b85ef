//! Blocking primitives shared by every race protocol
//!
//! - [`CountDownLatch`] - the countdown barrier all protocols are built from
//! - [`Interrupt`] - cancellation for a participant blocked in a latch or sleep
//! - [`guarded_sleep`] - artificial delay that tolerates premature wakeups

mod interrupt;
mod latch;
mod sleep;

pub use interrupt::Interrupt;
pub use latch::CountDownLatch;
pub use sleep::guarded_sleep;
