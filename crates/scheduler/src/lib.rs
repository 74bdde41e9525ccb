//! PDF Reader Scheduler Library
//!
//! Cancellable delayed tasks and background result slots for the reader's
//! single UI queue.
//!
//! Everything that appears to run "later" in the reader goes through this
//! crate: long-press timers, the stylus decay timer, selection retry loops
//! and content loads that finish on a worker thread. Timers run on a virtual
//! clock that the owner advances explicitly, so the UI loop decides when
//! deferred work fires and tests never have to sleep.
//!
//! # Example
//!
//! ```
//! use pdf_reader_scheduler::TimerQueue;
//!
//! let mut timers = TimerQueue::new();
//!
//! // Arm a long-press timer 500ms after a pointer-down at t=1000
//! let handle = timers.schedule(1_000, 500, "long-press");
//!
//! // Nothing is due yet
//! assert!(timers.advance_to(1_200).is_empty());
//!
//! // A pointer-move past the slop cancels it before it fires
//! handle.cancel();
//! assert!(timers.advance_to(2_000).is_empty());
//! ```

mod cancel;
mod slot;
mod timer;

// Re-export public API
pub use cancel::{CancellationToken, TaskHandle, TaskId};
pub use slot::ResultSlot;
pub use timer::TimerQueue;
