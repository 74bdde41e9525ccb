//! Scroll animation integrator
//!
//! Drives the pager's two kinds of motion on the virtual clock:
//! - fixed-duration slides (settling a page onto screen, smart moves) with a
//!   decelerating ease-out
//! - flings, integrated per 60 Hz frame with exponential momentum decay and
//!   clamped to the scroll bounds of the current page
//!
//! Positions are integer pixel offsets from the motion's origin; the pager
//! tracks the last position it consumed and applies only the difference.

use pdf_reader_core::{ScreenOffset, ScreenRect};

/// Duration of one integration frame
const FRAME_MS: f32 = 1000.0 / 60.0;

/// Safety stop for fling simulation; a fling normally ends earlier, when
/// its velocity decays below the stop threshold or it runs into a bound
const MAX_FLING_FRAMES: u32 = 1200;

#[derive(Debug, Clone, PartialEq)]
enum Motion {
    Idle,
    Slide {
        /// Set on the first `compute` after the slide was started
        start_ms: Option<u64>,
        duration_ms: u64,
        from: ScreenOffset,
        delta: ScreenOffset,
    },
    Fling {
        start_ms: Option<u64>,
        frames_done: u32,
        state: FlingState,
        bounds: ScreenRect,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FlingState {
    x: f32,
    y: f32,
    /// Velocity in pixels per second
    vx: f32,
    vy: f32,
}

/// Time-driven scroll integrator
#[derive(Debug, Clone)]
pub struct Scroller {
    motion: Motion,
    curr: ScreenOffset,
    final_pos: ScreenOffset,
    /// Velocity multiplier applied each frame (0.0 - 1.0)
    momentum_decay: f32,
    /// Speed (px/s) below which a fling stops
    stop_velocity: f32,
}

impl Default for Scroller {
    fn default() -> Self {
        Self::new(0.92, 10.0)
    }
}

impl Scroller {
    pub fn new(momentum_decay: f32, stop_velocity: f32) -> Self {
        Self {
            motion: Motion::Idle,
            curr: ScreenOffset::default(),
            final_pos: ScreenOffset::default(),
            momentum_decay: momentum_decay.clamp(0.0, 0.999),
            stop_velocity: stop_velocity.max(f32::EPSILON),
        }
    }

    /// Slide from the origin by `(dx, dy)` over `duration_ms`
    ///
    /// The clock starts at the next [`compute`](Self::compute).
    pub fn start_scroll(&mut self, dx: i32, dy: i32, duration_ms: u64) {
        let delta = ScreenOffset::new(dx, dy);
        self.curr = ScreenOffset::default();
        self.final_pos = delta;
        self.motion = if duration_ms == 0 || delta.is_zero() {
            self.curr = delta;
            Motion::Idle
        } else {
            Motion::Slide {
                start_ms: None,
                duration_ms,
                from: ScreenOffset::default(),
                delta,
            }
        };
    }

    /// Fling from the origin with velocity `(vx, vy)` px/s, confined to `bounds`
    ///
    /// `bounds` is inclusive on every edge: `left..=right`, `top..=bottom`.
    pub fn fling(&mut self, vx: f32, vy: f32, bounds: ScreenRect) {
        let state = FlingState {
            x: 0.0,
            y: 0.0,
            vx,
            vy,
        };
        self.curr = ScreenOffset::default();
        self.final_pos = self.simulate(state, &bounds, MAX_FLING_FRAMES).0.position();
        self.motion = Motion::Fling {
            start_ms: None,
            frames_done: 0,
            state,
            bounds,
        };
        if self.final_pos.is_zero() && self.is_stopped(&state) {
            self.motion = Motion::Idle;
        }
    }

    /// Advance to `now_ms`
    ///
    /// Returns `false` once the scroller was already finished before this
    /// call, `true` while it is (or was, up to this call) animating.
    pub fn compute(&mut self, now_ms: u64) -> bool {
        let decay = self.momentum_decay;
        let stop = self.stop_velocity;
        match &mut self.motion {
            Motion::Idle => false,
            Motion::Slide {
                start_ms,
                duration_ms,
                from,
                delta,
            } => {
                let start = *start_ms.get_or_insert(now_ms);
                let elapsed = now_ms.saturating_sub(start);
                if elapsed >= *duration_ms {
                    self.curr = self.final_pos;
                    self.motion = Motion::Idle;
                    return true;
                }
                let t = elapsed as f32 / *duration_ms as f32;
                let eased = 1.0 - (1.0 - t).powi(3);
                self.curr = ScreenOffset::new(
                    from.x + (delta.x as f32 * eased).round() as i32,
                    from.y + (delta.y as f32 * eased).round() as i32,
                );
                true
            }
            Motion::Fling {
                start_ms,
                frames_done,
                state,
                bounds,
            } => {
                let start = *start_ms.get_or_insert(now_ms);
                let due = (now_ms.saturating_sub(start) as f32 / FRAME_MS) as u32;
                while *frames_done < due.min(MAX_FLING_FRAMES) {
                    *state = step(*state, bounds, decay);
                    *frames_done += 1;
                    if state.vx.abs() < stop && state.vy.abs() < stop {
                        break;
                    }
                }
                self.curr = state.position();
                let stopped = (state.vx.abs() < stop && state.vy.abs() < stop)
                    || *frames_done >= MAX_FLING_FRAMES;
                if stopped {
                    self.final_pos = self.curr;
                    self.motion = Motion::Idle;
                }
                true
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.motion == Motion::Idle
    }

    /// Stop where it is; `final_pos` becomes the current position
    pub fn force_finished(&mut self) {
        self.motion = Motion::Idle;
        self.final_pos = self.curr;
    }

    pub fn curr(&self) -> ScreenOffset {
        self.curr
    }

    pub fn final_pos(&self) -> ScreenOffset {
        self.final_pos
    }

    /// Distance still to travel
    pub fn remaining(&self) -> ScreenOffset {
        ScreenOffset::new(self.final_pos.x - self.curr.x, self.final_pos.y - self.curr.y)
    }

    fn is_stopped(&self, state: &FlingState) -> bool {
        state.vx.abs() < self.stop_velocity && state.vy.abs() < self.stop_velocity
    }

    fn simulate(&self, mut state: FlingState, bounds: &ScreenRect, max_frames: u32) -> (FlingState, u32) {
        let mut frames = 0;
        while frames < max_frames && !self.is_stopped(&state) {
            state = step(state, bounds, self.momentum_decay);
            frames += 1;
        }
        (state, frames)
    }
}

impl FlingState {
    fn position(&self) -> ScreenOffset {
        ScreenOffset::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// One integration frame: move, decay, then stop at the bounds
fn step(mut state: FlingState, bounds: &ScreenRect, decay: f32) -> FlingState {
    let dt = FRAME_MS / 1000.0;
    state.x += state.vx * dt;
    state.y += state.vy * dt;
    state.vx *= decay;
    state.vy *= decay;

    let (min_x, max_x) = (bounds.left as f32, bounds.right as f32);
    if state.x < min_x || state.x > max_x {
        state.x = state.x.clamp(min_x.min(max_x), max_x.max(min_x));
        state.vx = 0.0;
    }
    let (min_y, max_y) = (bounds.top as f32, bounds.bottom as f32);
    if state.y < min_y || state.y > max_y {
        state.y = state.y.clamp(min_y.min(max_y), max_y.max(min_y));
        state.vy = 0.0;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_bounds() -> ScreenRect {
        ScreenRect::new(-100_000, -100_000, 100_000, 100_000)
    }

    #[test]
    fn test_slide_reaches_target() {
        let mut scroller = Scroller::default();
        scroller.start_scroll(-300, 40, 400);
        assert!(!scroller.is_finished());
        assert_eq!(scroller.remaining(), ScreenOffset::new(-300, 40));

        // clock starts at the first compute
        assert!(scroller.compute(1_000));
        assert_eq!(scroller.curr(), ScreenOffset::new(0, 0));

        assert!(scroller.compute(1_200));
        let halfway = scroller.curr();
        // ease-out covers more than half the distance in half the time
        assert!(halfway.x < -150);

        assert!(scroller.compute(1_400));
        assert!(scroller.is_finished());
        assert_eq!(scroller.curr(), ScreenOffset::new(-300, 40));
        assert!(!scroller.compute(1_500));
    }

    #[test]
    fn test_zero_slide_is_immediately_finished() {
        let mut scroller = Scroller::default();
        scroller.start_scroll(0, 0, 400);
        assert!(scroller.is_finished());
    }

    #[test]
    fn test_fling_decays_and_stops() {
        let mut scroller = Scroller::default();
        scroller.fling(2_000.0, 0.0, wide_bounds());
        let target = scroller.final_pos();
        assert!(target.x > 0);
        assert_eq!(target.y, 0);

        scroller.compute(0);
        scroller.compute(100);
        let early = scroller.curr().x;
        assert!(early > 0 && early < target.x);

        scroller.compute(60_000);
        assert!(scroller.is_finished());
        assert_eq!(scroller.curr(), target);
    }

    #[test]
    fn test_fling_is_clamped_to_bounds() {
        let mut scroller = Scroller::default();
        scroller.fling(-50_000.0, 3_000.0, ScreenRect::new(-120, 0, 0, 50));
        assert_eq!(scroller.final_pos().x, -120);
        assert!(scroller.final_pos().y <= 50);

        scroller.compute(0);
        scroller.compute(10_000);
        assert!(scroller.is_finished());
        assert_eq!(scroller.curr().x, -120);
    }

    #[test]
    fn test_fling_into_bound_stops_on_first_frame() {
        let mut scroller = Scroller::default();
        scroller.fling(-50_000.0, 0.0, ScreenRect::new(-120, 0, 0, 50));

        scroller.compute(0);
        assert!(!scroller.is_finished());

        // one frame is due; the bound zeroes the velocity
        scroller.compute(17);
        assert!(scroller.is_finished());
        assert_eq!(scroller.curr(), ScreenOffset::new(-120, 0));
        assert!(!scroller.compute(18));
    }

    #[test]
    fn test_force_finished_keeps_position() {
        let mut scroller = Scroller::default();
        scroller.start_scroll(500, 0, 400);
        scroller.compute(0);
        scroller.compute(100);
        let here = scroller.curr();

        scroller.force_finished();
        assert!(scroller.is_finished());
        assert_eq!(scroller.final_pos(), here);
        assert_eq!(scroller.remaining(), ScreenOffset::new(0, 0));
    }
}
