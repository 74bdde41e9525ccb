//! Long-press disambiguation and the text-selection retry loop
//!
//! A press in a long-press mode arms a cancellable timer (twice as long for
//! a stylus). Moving past the touch slop, lifting the pointer or starting a
//! new gesture cancels it. When it fires the disambiguator decides what the
//! press meant:
//! - on the selected text annotation: nothing (the press belongs to the
//!   manipulation gesture)
//! - a stylus held still in drawing mode: an accidental mark
//! - otherwise in viewing/selecting: select the text under the press
//!
//! Text may not be laid out yet when a selection is attempted, so
//! [`SelectionRetry`] re-attempts on a fixed interval with a bounded budget.

use crate::event::ReaderTimer;
use crate::mode::InteractionMode;
use pdf_reader_core::{DocRect, GestureConfig, ScreenPoint};
use pdf_reader_scheduler::{TaskHandle, TaskId, TimerQueue};

/// The press a long-press timer is waiting on
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPress {
    pub screen: ScreenPoint,
    pub page: usize,
    /// Selection probe around the press, in document units
    pub probe: Option<DocRect>,
    pub stylus: bool,
    /// The press landed inside the selected text annotation
    pub on_selected_text: bool,
}

/// What a fired long-press asks the router to do
#[derive(Debug, Clone, PartialEq)]
pub enum LongPressAction {
    None,
    /// The press only cleared its own pending state
    ClearPending,
    /// Drawing-mode stylus press held still: drop the mark and leave drawing
    AccidentalMark,
    SelectText { page: usize, probe: DocRect },
}

#[derive(Debug)]
pub struct LongPressDisambiguator {
    touch_slop_px: f32,
    timeout_ms: u64,
    stylus_timeout_ms: u64,
    pending: Option<PendingPress>,
    timer: Option<TaskHandle>,
}

impl LongPressDisambiguator {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            touch_slop_px: config.touch_slop_px(),
            timeout_ms: config.long_press_delay_ms(false),
            stylus_timeout_ms: config.long_press_delay_ms(true),
            pending: None,
            timer: None,
        }
    }

    pub fn pending(&self) -> Option<&PendingPress> {
        self.pending.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Pointer down; returns whether a long-press was armed
    ///
    /// Presses on a selection marker never arm. Presses outside the selected
    /// text annotation first cancel any selection retry still in flight.
    pub fn on_down(
        &mut self,
        press: PendingPress,
        mode: InteractionMode,
        on_marker: bool,
        now_ms: u64,
        timers: &mut TimerQueue<ReaderTimer>,
        retry: &mut SelectionRetry,
    ) -> bool {
        self.cancel();
        if !mode.accepts_long_press() || on_marker {
            return false;
        }
        if !press.on_selected_text {
            retry.cancel();
        }

        let delay = if press.stylus {
            self.stylus_timeout_ms
        } else {
            self.timeout_ms
        };
        self.pending = Some(press);
        self.timer = Some(timers.schedule(now_ms, delay, ReaderTimer::LongPress));
        true
    }

    /// Pointer moved; cancels once it leaves the touch slop
    pub fn on_move(&mut self, point: &ScreenPoint) {
        let moved = self
            .pending
            .as_ref()
            .is_some_and(|press| press.screen.exceeds_slop(point, self.touch_slop_px));
        if moved {
            self.cancel();
        }
    }

    /// Up, cancel, fling, pinch or tap
    pub fn cancel(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.cancel();
        }
        self.pending = None;
    }

    /// The long-press timer `id` fired
    pub fn on_fired(&mut self, id: TaskId, mode: InteractionMode) -> LongPressAction {
        if !self.timer.as_ref().is_some_and(|handle| handle.id() == id) {
            return LongPressAction::None;
        }
        self.timer = None;
        let Some(press) = self.pending.take() else {
            return LongPressAction::None;
        };
        log::debug!("long press fired in {} mode (stylus: {})", mode, press.stylus);

        if press.on_selected_text {
            return LongPressAction::ClearPending;
        }
        match mode {
            InteractionMode::Drawing if press.stylus => LongPressAction::AccidentalMark,
            InteractionMode::Viewing | InteractionMode::Selecting => match press.probe {
                Some(probe) => LongPressAction::SelectText {
                    page: press.page,
                    probe,
                },
                None => LongPressAction::None,
            },
            _ => LongPressAction::None,
        }
    }
}

/// Where a selection attempt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOrigin {
    LongPress,
    Tap,
}

/// Result of a retry tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Not the current retry timer
    Ignored,
    /// Page or mode changed; the loop stopped silently
    Aborted,
    Selected { origin: RetryOrigin },
    Retrying,
    Exhausted { origin: RetryOrigin },
}

#[derive(Debug, Clone)]
struct RetryState {
    origin: RetryOrigin,
    page: usize,
    probe: DocRect,
    attempts: u32,
}

/// Bounded re-attempts of a text selection while page text loads
#[derive(Debug)]
pub struct SelectionRetry {
    interval_ms: u64,
    max_attempts: u32,
    state: Option<RetryState>,
    timer: Option<TaskHandle>,
}

impl SelectionRetry {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            interval_ms: config.selection_retry_interval_ms,
            max_attempts: config.selection_retry_attempts,
            state: None,
            timer: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Start retrying after a first attempt at `probe` on `page` failed
    pub fn start(
        &mut self,
        origin: RetryOrigin,
        page: usize,
        probe: DocRect,
        now_ms: u64,
        timers: &mut TimerQueue<ReaderTimer>,
    ) {
        self.cancel();
        self.state = Some(RetryState {
            origin,
            page,
            probe,
            attempts: 0,
        });
        self.timer = Some(timers.schedule(now_ms, self.interval_ms, ReaderTimer::SelectionRetry));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.cancel();
        }
        self.state = None;
    }

    /// Retry timer `id` fired
    ///
    /// `try_select` attempts the selection and reports whether text got
    /// selected.
    pub fn on_fired<F>(
        &mut self,
        id: TaskId,
        current_page: usize,
        mode: InteractionMode,
        now_ms: u64,
        timers: &mut TimerQueue<ReaderTimer>,
        mut try_select: F,
    ) -> RetryOutcome
    where
        F: FnMut(&DocRect) -> bool,
    {
        if !self.timer.as_ref().is_some_and(|handle| handle.id() == id) {
            return RetryOutcome::Ignored;
        }
        self.timer = None;
        let Some(mut state) = self.state.take() else {
            return RetryOutcome::Ignored;
        };

        let mode_ok = match state.origin {
            RetryOrigin::LongPress => {
                matches!(mode, InteractionMode::Viewing | InteractionMode::Selecting)
            }
            RetryOrigin::Tap => mode == InteractionMode::Selecting,
        };
        if state.page != current_page || !mode_ok {
            return RetryOutcome::Aborted;
        }

        if try_select(&state.probe) {
            return RetryOutcome::Selected {
                origin: state.origin,
            };
        }

        state.attempts += 1;
        if state.attempts >= self.max_attempts {
            log::debug!(
                "text selection gave up after {} attempts on page {}",
                state.attempts,
                state.page
            );
            return RetryOutcome::Exhausted {
                origin: state.origin,
            };
        }

        self.state = Some(state);
        self.timer = Some(timers.schedule(now_ms, self.interval_ms, ReaderTimer::SelectionRetry));
        RetryOutcome::Retrying
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(stylus: bool, on_selected_text: bool) -> PendingPress {
        PendingPress {
            screen: ScreenPoint::new(100.0, 100.0),
            page: 0,
            probe: Some(DocRect::new(100.0, 100.0, 112.0, 112.0)),
            stylus,
            on_selected_text,
        }
    }

    fn fired(timers: &mut TimerQueue<ReaderTimer>, now_ms: u64) -> Vec<(TaskId, ReaderTimer)> {
        timers.advance_to(now_ms)
    }

    #[test]
    fn test_long_press_fires_select_text() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        let mut lp = LongPressDisambiguator::new(&config);

        assert!(lp.on_down(press(false, false), InteractionMode::Viewing, false, 0, &mut timers, &mut retry));
        assert!(fired(&mut timers, 499).is_empty());
        let due = fired(&mut timers, 500);
        assert_eq!(due.len(), 1);

        let action = lp.on_fired(due[0].0, InteractionMode::Viewing);
        assert!(matches!(action, LongPressAction::SelectText { page: 0, .. }));
        assert!(!lp.is_armed());
    }

    #[test]
    fn test_stylus_delay_doubles() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        let mut lp = LongPressDisambiguator::new(&config);

        lp.on_down(press(true, false), InteractionMode::Drawing, false, 0, &mut timers, &mut retry);
        assert!(fired(&mut timers, 999).is_empty());
        let due = fired(&mut timers, 1_000);
        assert_eq!(lp.on_fired(due[0].0, InteractionMode::Drawing), LongPressAction::AccidentalMark);
    }

    #[test]
    fn test_move_past_slop_cancels() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        let mut lp = LongPressDisambiguator::new(&config);

        lp.on_down(press(false, false), InteractionMode::Viewing, false, 0, &mut timers, &mut retry);
        lp.on_move(&ScreenPoint::new(104.0, 103.0));
        assert!(lp.is_armed());
        lp.on_move(&ScreenPoint::new(100.0, 120.0));
        assert!(!lp.is_armed());
        assert!(fired(&mut timers, 1_000).is_empty());
    }

    #[test]
    fn test_modes_and_markers_that_do_not_arm() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        let mut lp = LongPressDisambiguator::new(&config);

        assert!(!lp.on_down(press(false, false), InteractionMode::Erasing, false, 0, &mut timers, &mut retry));
        assert!(!lp.on_down(press(false, false), InteractionMode::Selecting, true, 0, &mut timers, &mut retry));
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_press_on_selected_text_keeps_retry_and_only_clears() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        let mut lp = LongPressDisambiguator::new(&config);

        retry.start(RetryOrigin::LongPress, 0, DocRect::new(0.0, 0.0, 1.0, 1.0), 0, &mut timers);
        lp.on_down(press(false, true), InteractionMode::Viewing, false, 0, &mut timers, &mut retry);
        assert!(retry.is_active());

        let due: Vec<_> = fired(&mut timers, 500)
            .into_iter()
            .filter(|(_, t)| *t == ReaderTimer::LongPress)
            .collect();
        assert_eq!(lp.on_fired(due[0].0, InteractionMode::Viewing), LongPressAction::ClearPending);

        // a press elsewhere cancels the retry loop
        lp.on_down(press(false, false), InteractionMode::Viewing, false, 600, &mut timers, &mut retry);
        assert!(!retry.is_active());
    }

    #[test]
    fn test_retry_until_text_arrives() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        retry.start(RetryOrigin::LongPress, 2, DocRect::new(0.0, 0.0, 12.0, 12.0), 0, &mut timers);

        let mut now = 0;
        let mut attempts = 0;
        let outcome = loop {
            now += 120;
            let due = timers.advance_to(now);
            assert_eq!(due.len(), 1);
            let outcome = retry.on_fired(due[0].0, 2, InteractionMode::Viewing, now, &mut timers, |_| {
                attempts += 1;
                attempts == 3
            });
            if outcome != RetryOutcome::Retrying {
                break outcome;
            }
        };
        assert_eq!(outcome, RetryOutcome::Selected { origin: RetryOrigin::LongPress });
        assert!(!retry.is_active());
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        retry.start(RetryOrigin::Tap, 0, DocRect::new(0.0, 0.0, 12.0, 12.0), 0, &mut timers);

        let mut ticks = 0;
        let mut now = 0;
        loop {
            now += 120;
            let due = timers.advance_to(now);
            if due.is_empty() {
                break;
            }
            ticks += 1;
            let outcome = retry.on_fired(due[0].0, 0, InteractionMode::Selecting, now, &mut timers, |_| false);
            if let RetryOutcome::Exhausted { origin } = outcome {
                assert_eq!(origin, RetryOrigin::Tap);
                break;
            }
        }
        assert_eq!(ticks, config.selection_retry_attempts);
    }

    #[test]
    fn test_retry_aborts_on_page_change() {
        let config = GestureConfig::default();
        let mut timers = TimerQueue::new();
        let mut retry = SelectionRetry::new(&config);
        retry.start(RetryOrigin::LongPress, 0, DocRect::new(0.0, 0.0, 12.0, 12.0), 0, &mut timers);

        let due = timers.advance_to(120);
        let outcome = retry.on_fired(due[0].0, 1, InteractionMode::Viewing, 120, &mut timers, |_| true);
        assert_eq!(outcome, RetryOutcome::Aborted);
        assert_eq!(timers.pending(), 0);
    }
}
