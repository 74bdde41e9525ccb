//! Delayed task queue on a virtual clock
//!
//! Tasks are ordered by due time, with FIFO ordering among tasks due at the
//! same instant. The queue never reads the wall clock; the owner passes the
//! current time into [`TimerQueue::schedule`] and [`TimerQueue::advance_to`].

use crate::cancel::{CancellationToken, TaskHandle, TaskId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A pending entry in the timer heap
#[derive(Debug)]
struct TimerEntry<T> {
    id: TaskId,
    due_ms: u64,
    insertion_order: u64,
    token: CancellationToken,
    payload: T,
}

impl<T> PartialEq for TimerEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.insertion_order == other.insertion_order
    }
}

impl<T> Eq for TimerEntry<T> {}

impl<T> PartialOrd for TimerEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TimerEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap: earliest due (then earliest inserted) must compare greatest
        match other.due_ms.cmp(&self.due_ms) {
            Ordering::Equal => other.insertion_order.cmp(&self.insertion_order),
            ord => ord,
        }
    }
}

/// Queue of cancellable delayed tasks
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<TimerEntry<T>>,
    next_task_id: TaskId,
    insertion_counter: u64,
    now_ms: u64,
}

impl<T> TimerQueue<T> {
    /// Create an empty queue with the clock at zero
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_task_id: 1,
            insertion_counter: 0,
            now_ms: 0,
        }
    }

    /// Latest time observed by the queue
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `payload` to fire `delay_ms` after `now_ms`
    ///
    /// The clock never runs backwards: a `now_ms` older than the latest
    /// observed time is treated as the latest observed time.
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, payload: T) -> TaskHandle {
        self.now_ms = self.now_ms.max(now_ms);

        let id = self.next_task_id;
        self.next_task_id += 1;
        let insertion_order = self.insertion_counter;
        self.insertion_counter += 1;

        let token = CancellationToken::new();
        self.heap.push(TimerEntry {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            insertion_order,
            token: token.clone(),
            payload,
        });

        TaskHandle::new(id, token)
    }

    /// Advance the clock and return every task that became due
    ///
    /// Cancelled tasks are dropped silently. Tasks are returned in firing order.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<(TaskId, T)> {
        self.now_ms = self.now_ms.max(now_ms);

        let mut fired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.due_ms > self.now_ms {
                break;
            }
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if entry.token.is_cancelled() {
                continue;
            }
            // A fired task counts as consumed for anyone still holding the handle
            entry.token.cancel();
            fired.push((entry.id, entry.payload));
        }

        if !fired.is_empty() {
            log::trace!("timer queue fired {} task(s) at {}ms", fired.len(), self.now_ms);
        }
        fired
    }

    /// Cancel every pending task
    pub fn cancel_all(&mut self) {
        for entry in self.heap.drain() {
            entry.token.cancel();
        }
    }

    /// Number of tasks that are still waiting to fire
    pub fn pending(&self) -> usize {
        self.heap
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .count()
    }

    /// Due time of the earliest task that has not been cancelled
    pub fn next_due(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .map(|entry| entry.due_ms)
            .min()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
