//! Recent-stylus tracking
//!
//! Every stylus event marks the stylus as recently active and re-arms a
//! decay timer. While the mark is set and stylus mode is on, pinch-zoom is
//! blocked so a palm or second finger cannot zoom mid-stroke.

use crate::event::ReaderTimer;
use pdf_reader_scheduler::{TaskHandle, TaskId, TimerQueue};

#[derive(Debug)]
pub struct StylusTracker {
    decay_ms: u64,
    recent: bool,
    decay: Option<TaskHandle>,
}

impl StylusTracker {
    /// `decay_ms` is how long the stylus counts as recent after its last event
    pub fn new(decay_ms: u64) -> Self {
        Self {
            decay_ms,
            recent: false,
            decay: None,
        }
    }

    /// A stylus event arrived at `now_ms`
    pub fn mark(&mut self, now_ms: u64, timers: &mut TimerQueue<ReaderTimer>) {
        self.recent = true;
        self.cancel();
        self.decay = Some(timers.schedule(now_ms, self.decay_ms, ReaderTimer::StylusDecay));
    }

    /// The decay timer `id` fired; stale timers are ignored
    pub fn on_decay(&mut self, id: TaskId) -> bool {
        if self.decay.as_ref().is_some_and(|handle| handle.id() == id) {
            self.decay = None;
            self.recent = false;
            return true;
        }
        false
    }

    pub fn is_recent(&self) -> bool {
        self.recent
    }

    pub fn should_block_scale(&self, use_stylus: bool) -> bool {
        use_stylus && self.recent
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.decay.take() {
            handle.cancel();
        }
    }
}
