//! Generation-stamped result slots for background loads
//!
//! A worker thread publishes into a slot; the UI tick reads it. Each value is
//! stamped with the generation that requested it, so a result that arrives
//! after the page scrolled away (and the owner bumped its generation) is
//! discarded instead of being applied to the wrong page.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct SlotState<T> {
    generation: u64,
    value: Option<T>,
    /// Incremented on every accepted publish
    version: u64,
}

/// Shared single-value slot written by a background worker
#[derive(Debug)]
pub struct ResultSlot<T> {
    state: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> ResultSlot<T> {
    /// Create an empty slot expecting results for `generation`
    pub fn new(generation: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState {
                generation,
                value: None,
                version: 0,
            })),
        }
    }

    /// Generation this slot currently accepts
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Publish a result computed for `generation`
    ///
    /// Returns `false` (and drops the value) if the slot has moved on to a
    /// newer generation.
    pub fn publish(&self, generation: u64, value: T) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            log::debug!(
                "dropping stale load result (generation {} != {})",
                generation,
                state.generation
            );
            return false;
        }
        state.value = Some(value);
        state.version += 1;
        true
    }

    /// Move the slot to a new generation, discarding any held value
    pub fn reset(&self, generation: u64) {
        let mut state = self.lock();
        state.generation = generation;
        state.value = None;
    }

    /// Remove and return the value if the slot is still on `generation`
    ///
    /// A reader that has moved on to a newer generation gets `None` even if
    /// an older value is still held.
    pub fn take(&self, generation: u64) -> Option<T> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        state.value.take()
    }

    /// Whether a value for the current generation is available
    pub fn is_ready(&self) -> bool {
        self.lock().value.is_some()
    }

    /// Number of accepted publishes so far
    ///
    /// Readers compare this against the version they last applied to detect
    /// a reload.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Clone out the current value, if any
    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_and_read() {
        let slot = ResultSlot::new(1);
        assert!(!slot.is_ready());

        assert!(slot.publish(1, vec![1, 2, 3]));
        assert!(slot.is_ready());
        assert_eq!(slot.get(), Some(vec![1, 2, 3]));
        assert_eq!(slot.version(), 1);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let slot = ResultSlot::new(1);
        slot.reset(2);

        assert!(!slot.publish(1, "old page"));
        assert_eq!(slot.get(), None);
        assert_eq!(slot.version(), 0);
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn test_reset_clears_value() {
        let slot = ResultSlot::new(1);
        slot.publish(1, 42);
        slot.reset(2);

        assert!(!slot.is_ready());
        assert_eq!(slot.version(), 1);
    }

    #[test]
    fn test_take_empties_slot() {
        let slot = ResultSlot::new(3);
        slot.publish(3, 'a');

        assert_eq!(slot.take(2), None);
        assert_eq!(slot.take(3), Some('a'));
        assert_eq!(slot.take(3), None);
        assert_eq!(slot.version(), 1);
    }

    #[test]
    fn test_publish_from_worker_thread() {
        let slot = ResultSlot::new(5);
        let worker_slot = slot.clone();

        let worker = thread::spawn(move || worker_slot.publish(5, String::from("loaded")));
        assert!(worker.join().unwrap());

        assert_eq!(slot.get().as_deref(), Some("loaded"));
    }
}
