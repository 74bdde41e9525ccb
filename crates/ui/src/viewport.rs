//! Viewport state
//!
//! Plain data shared by the pager and the gesture router: zoom scale,
//! scroll accumulated since the last layout, the scroller and its last
//! consumed position, the pinch focus, and normalized scroll/scale requests
//! waiting for the next layout to resolve them into pixels.

use crate::scroller::Scroller;
use pdf_reader_core::ScreenOffset;

/// Scale bounds of the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Both bounds are multiplied by this in reflow mode
    pub reflow_factor: f32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 10.0,
            reflow_factor: 0.5,
        }
    }
}

impl ScaleLimits {
    /// `(min, max)` for the given layout mode
    pub fn bounds(&self, reflow: bool) -> (f32, f32) {
        let factor = if reflow { self.reflow_factor } else { 1.0 };
        (self.min_scale * factor, self.max_scale * factor)
    }

    pub fn clamp(&self, scale: f32, reflow: bool) -> f32 {
        let (min, max) = self.bounds(reflow);
        scale.max(min).min(max)
    }
}

/// Normalized requests applied at the next layout
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PendingRequests {
    pub normalized_scale: Option<f32>,
    pub normalized_x: Option<f32>,
    pub normalized_y: Option<f32>,
    /// Scroll in document units relative to the page origin
    pub doc_rel_x: Option<f32>,
    pub doc_rel_y: Option<f32>,
    /// Centre the next normalized scroll instead of aligning the top-left
    pub scroll_with_center: bool,
}

impl PendingRequests {
    pub fn has_scroll(&self) -> bool {
        self.normalized_x.is_some() || self.normalized_y.is_some()
    }
}

/// Scale, scroll and animation state of one reader viewport
#[derive(Debug, Clone)]
pub struct ViewportState {
    limits: ScaleLimits,
    reflow: bool,
    scale: f32,
    /// Scroll accumulated since the last layout
    pub scroll: ScreenOffset,
    /// Scroller position already folded into `scroll`
    pub scroller_last: ScreenOffset,
    /// Focus of the previous pinch step
    pub prev_focus: ScreenOffset,
    pub pending: PendingRequests,
    pub scroller: Scroller,
}

impl ViewportState {
    pub fn new(limits: ScaleLimits, scroller: Scroller) -> Self {
        Self {
            limits,
            reflow: false,
            scale: limits.clamp(1.0, false),
            scroll: ScreenOffset::default(),
            scroller_last: ScreenOffset::default(),
            prev_focus: ScreenOffset::default(),
            pending: PendingRequests::default(),
            scroller,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set the scale, clamped into the current bounds
    ///
    /// Non-finite or non-positive values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = self.limits.clamp(scale, self.reflow);
        }
    }

    pub fn limits(&self) -> ScaleLimits {
        self.limits
    }

    pub fn scale_bounds(&self) -> (f32, f32) {
        self.limits.bounds(self.reflow)
    }

    pub fn reflow(&self) -> bool {
        self.reflow
    }

    /// Switch layout mode; the scale is re-clamped into the new bounds
    pub fn set_reflow(&mut self, reflow: bool) {
        self.reflow = reflow;
        self.scale = self.limits.clamp(self.scale, reflow);
    }

    pub fn add_scroll(&mut self, dx: i32, dy: i32) {
        self.scroll.x += dx;
        self.scroll.y += dy;
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = ScreenOffset::default();
    }

    /// Fold new scroller progress into `scroll`
    pub fn consume_scroller(&mut self) {
        let curr = self.scroller.curr();
        self.scroll.x += curr.x - self.scroller_last.x;
        self.scroll.y += curr.y - self.scroller_last.y;
        self.scroller_last = curr;
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(ScaleLimits::default(), Scroller::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_clamped() {
        let mut viewport = ViewportState::default();
        viewport.set_scale(25.0);
        assert_eq!(viewport.scale(), 10.0);
        viewport.set_scale(0.2);
        assert_eq!(viewport.scale(), 1.0);
        viewport.set_scale(f32::NAN);
        assert_eq!(viewport.scale(), 1.0);
    }

    #[test]
    fn test_reflow_reclamps() {
        let mut viewport = ViewportState::default();
        viewport.set_scale(8.0);
        viewport.set_reflow(true);
        assert_eq!(viewport.scale_bounds(), (0.5, 5.0));
        assert_eq!(viewport.scale(), 5.0);

        viewport.set_reflow(false);
        assert_eq!(viewport.scale(), 5.0);
    }

    #[test]
    fn test_consume_scroller() {
        let mut viewport = ViewportState::default();
        viewport.scroller.start_scroll(100, 0, 100);
        viewport.scroller.compute(0);
        viewport.scroller.compute(100);
        viewport.consume_scroller();
        assert_eq!(viewport.scroll, ScreenOffset::new(100, 0));

        // consuming again without progress adds nothing
        viewport.consume_scroller();
        assert_eq!(viewport.scroll, ScreenOffset::new(100, 0));
    }
}
