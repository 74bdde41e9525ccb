//! Cancellation tokens and task handles
//!
//! A scheduled task is represented by a [`TaskHandle`]. The handle shares a
//! cancellation flag with the entry sitting in the timer queue, so the owner
//! can cancel a pending long-press or retry without reaching into the queue.
//! Cancellation is cooperative: it prevents a future firing, it never
//! interrupts work that is already running.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Unique task identifier
pub type TaskId = u64;

/// Cancellation token for cooperative task cancellation
///
/// Multiple tokens can share the same underlying cancellation state via Arc,
/// which lets the timer queue and the task owner observe the same flag.
///
/// # Example
///
/// ```
/// use pdf_reader_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let queued = token.clone();
///
/// token.cancel();
/// assert!(queued.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token
    ///
    /// The token starts in a non-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token
    ///
    /// All clones of this token will also observe the cancellation.
    /// Calling it more than once has no further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if this token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Reset this token to non-cancelled state
    ///
    /// All clones will also be reset.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a task scheduled on a [`TimerQueue`](crate::TimerQueue)
///
/// Owners store the handle of every pending task and cancel it before
/// scheduling a replacement.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    token: CancellationToken,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    /// The queue-assigned id of the task
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Prevent the task from firing
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the task was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
