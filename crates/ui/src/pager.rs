//! Virtualized pager
//!
//! Keeps a sliding window of page surfaces around the current page, lays
//! them out edge to edge with a fixed gap, and runs the scroll machinery on
//! top: drag scrolling with page switching at the midpoint, flings confined
//! to the current page's scroll bounds, slides that settle a page onto
//! screen, pinch-zoom around a focus point and column-wise "smart" moves.
//!
//! Surfaces leaving the window release their resources and go into a small
//! FIFO pool that the adapter may reuse for the next page it creates.
//!
//! The pager never renders anything itself. It reports what happened as
//! [`PagerEvent`]s that the owner drains after each call.

use crate::scroller::Scroller;
use crate::transform::{
    clamp_scale, correction, direction_of_travel, fill_screen_scale, fit_width_snap, min_zoom,
    normalized_from_doc_rel_x, normalized_from_doc_rel_y, normalized_scale, normalized_x,
    normalized_y, preset_pixels_from_normalized, scale_correction, scroll_bounds, scroll_for_scale,
    sub_screen_size_offset, target_pixels_from_normalized, within_bounds_in_direction_of_travel,
    Container, Direction, MinZoom, ScreenFrame,
};
use crate::viewport::{ScaleLimits, ViewportState};
use pdf_reader_core::{DocSize, ScreenOffset, ScreenRect};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Where and how large a surface is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildFrame {
    pub page: usize,
    pub rect: ScreenRect,
    /// Document units to screen pixels
    pub page_scale: f32,
    /// Current zoom of the viewport
    pub view_scale: f32,
    pub reflow: bool,
}

/// A page view the pager positions
pub trait PageSurface {
    /// Document size of the page currently shown
    fn measure(&self) -> DocSize;

    /// Draw at the given placement
    fn render(&mut self, frame: &ChildFrame);

    /// Free bitmaps and cancel loads before the surface is pooled
    fn release_resources(&mut self);
}

/// Supplies surfaces for page indices
pub trait PageAdapter {
    type Surface: PageSurface;

    fn count(&self) -> usize;

    /// Build the surface for `index`, reinitialising `recycled` if given
    fn create_or_reuse(&mut self, index: usize, recycled: Option<Self::Surface>) -> Self::Surface;
}

/// Notifications for the pager's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerEvent {
    /// The page stopped moving and may be rendered at high resolution
    Settle(usize),
    /// A settled page started moving again
    Unsettle(usize),
    MoveToChild(usize),
    MoveOffChild(usize),
}

/// Pager tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PagerConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub reflow_scale_factor: f32,
    /// Gap between neighbouring pages
    pub gap_px: i32,
    /// How far outside the scroll bounds a fling may still start
    pub fling_margin_px: i32,
    pub slide_duration_ms: u64,
    /// Fling velocity multiplier per 60 Hz frame
    pub momentum_decay: f32,
    /// Fling speed (px/s) at which motion stops
    pub stop_velocity: f32,
    /// Surfaces kept for reuse
    pub pool_capacity: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 10.0,
            reflow_scale_factor: 0.5,
            gap_px: 20,
            fling_margin_px: 100,
            slide_duration_ms: 400,
            momentum_decay: 0.92,
            stop_velocity: 10.0,
            pool_capacity: 3,
        }
    }
}

impl PagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale_range(mut self, min_scale: f32, max_scale: f32) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    pub fn with_gap(mut self, gap_px: i32) -> Self {
        self.gap_px = gap_px;
        self
    }

    pub fn with_slide_duration(mut self, duration_ms: u64) -> Self {
        self.slide_duration_ms = duration_ms;
        self
    }

    pub fn with_momentum(mut self, decay: f32, stop_velocity: f32) -> Self {
        self.momentum_decay = decay;
        self.stop_velocity = stop_velocity;
        self
    }

    fn limits(&self) -> ScaleLimits {
        ScaleLimits {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            reflow_factor: self.reflow_scale_factor,
        }
    }
}

/// Serializable pager state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagerState {
    pub current: usize,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub scroller_last_x: i32,
    pub scroller_last_y: i32,
    pub prev_focus_x: i32,
    pub prev_focus_y: i32,
    pub reflow: bool,
    pub scroll_disabled: bool,
    pub normalized_scale: f32,
}

struct PageChild<S> {
    surface: S,
    doc_size: DocSize,
    intrinsic: MinZoom,
    fill: f32,
    width: i32,
    height: i32,
    rect: ScreenRect,
}

impl<S: PageSurface> PageChild<S> {
    fn new(surface: S) -> Self {
        Self {
            surface,
            doc_size: DocSize::default(),
            intrinsic: MinZoom {
                source_scale: 0.0,
                width: 0,
                height: 0,
            },
            fill: 1.0,
            width: 0,
            height: 0,
            rect: ScreenRect::default(),
        }
    }

    fn measure(&mut self, container: &Container, reflow: bool, view_scale: f32) {
        self.doc_size = self.surface.measure();
        self.intrinsic = min_zoom(self.doc_size, container.width as f32, container.height as f32);
        self.fill = fill_screen_scale(container, self.intrinsic.width, self.intrinsic.height);
        if reflow {
            self.width = self.intrinsic.width;
            self.height = self.intrinsic.height;
        } else {
            self.width = (self.intrinsic.width as f32 * self.fill * view_scale) as i32;
            self.height = (self.intrinsic.height as f32 * self.fill * view_scale) as i32;
        }
    }

    fn page_scale(&self) -> f32 {
        if self.doc_size.width > 0.0 {
            self.width as f32 / self.doc_size.width
        } else {
            0.0
        }
    }

    fn place(&mut self, left: i32, top: i32) {
        self.rect = ScreenRect::new(left, top, left + self.width, top + self.height);
    }
}

/// Geometry of the page a smart move may continue onto
#[derive(Debug, Clone, Copy)]
struct Neighbour {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

/// Sliding window of page surfaces with scroll, fling and zoom
pub struct Pager<A: PageAdapter> {
    config: PagerConfig,
    adapter: A,
    container: Container,
    viewport: ViewportState,
    children: HashMap<usize, PageChild<A::Surface>>,
    pool: VecDeque<A::Surface>,
    current: usize,
    pending_index: Option<usize>,
    interacting: bool,
    scaling: bool,
    scroll_disabled: bool,
    fit_width: bool,
    settled: Option<usize>,
    events: Vec<PagerEvent>,
}

impl<A: PageAdapter> Pager<A> {
    pub fn new(adapter: A, config: PagerConfig) -> Self {
        let scroller = Scroller::new(config.momentum_decay, config.stop_velocity);
        let viewport = ViewportState::new(config.limits(), scroller);
        Self {
            config,
            adapter,
            container: Container::default(),
            viewport,
            children: HashMap::new(),
            pool: VecDeque::new(),
            current: 0,
            pending_index: None,
            interacting: false,
            scaling: false,
            scroll_disabled: false,
            fit_width: false,
            settled: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn count(&self) -> usize {
        self.adapter.count()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn scale(&self) -> f32 {
        self.viewport.scale()
    }

    pub fn is_scaling(&self) -> bool {
        self.scaling
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn scroll_disabled(&self) -> bool {
        self.scroll_disabled
    }

    pub fn reflow(&self) -> bool {
        self.viewport.reflow()
    }

    pub fn is_settled(&self) -> bool {
        self.settled == Some(self.current)
    }

    /// Whether a scroll animation is running
    pub fn is_animating(&self) -> bool {
        !self.viewport.scroller.is_finished()
    }

    /// Indices of the surfaces currently held, ascending
    pub fn child_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.children.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    pub fn child_rect(&self, index: usize) -> Option<ScreenRect> {
        self.children.get(&index).map(|child| child.rect)
    }

    /// Screen placement of a page's document origin
    pub fn page_frame(&self, index: usize) -> Option<ScreenFrame> {
        let child = self.children.get(&index)?;
        let scale = child.page_scale();
        (scale > 0.0).then(|| ScreenFrame::new(child.rect.left as f32, child.rect.top as f32, scale))
    }

    pub fn current_frame(&self) -> Option<ScreenFrame> {
        self.page_frame(self.current)
    }

    /// Document size of a laid-out page
    pub fn page_size(&self, index: usize) -> Option<DocSize> {
        self.children.get(&index).map(|child| child.doc_size)
    }

    /// Drain pending notifications
    pub fn drain_events(&mut self) -> Vec<PagerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resize the hosting view
    pub fn set_container(&mut self, container: Container) {
        self.container = container;
        self.layout();
    }

    /// Request a jump to page `index`; applied at the next layout
    pub fn set_displayed_index(&mut self, index: usize) {
        if index < self.adapter.count() {
            self.pending_index = Some(index);
            self.layout();
        }
    }

    pub fn set_fit_width(&mut self, fit_width: bool) {
        self.fit_width = fit_width;
    }

    pub fn set_reflow(&mut self, reflow: bool) {
        if self.viewport.reflow() != reflow {
            self.viewport.set_reflow(reflow);
            self.layout();
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.viewport.set_scale(scale);
        self.layout();
    }

    /// Scale relative to fit-to-width of the current page
    pub fn normalized_scale(&self) -> f32 {
        match self.children.get(&self.current) {
            Some(child) => normalized_scale(
                self.viewport.scale(),
                &self.container,
                child.intrinsic.width,
                child.intrinsic.height,
            ),
            None => 1.0,
        }
    }

    pub fn normalized_x_scroll(&self) -> f32 {
        self.children.get(&self.current).map_or(0.0, |child| {
            normalized_x(child.rect.left, self.container.padding.left, child.width)
        })
    }

    pub fn normalized_y_scroll(&self) -> f32 {
        self.children.get(&self.current).map_or(0.0, |child| {
            normalized_y(child.rect.top, self.container.padding.top, child.height)
        })
    }

    pub fn set_normalized_scale(&mut self, normalized: f32) {
        self.viewport.pending.normalized_scale = Some(normalized);
        self.layout();
    }

    /// Scroll so the page's normalized position is `(x, y)`
    ///
    /// With `centred` the position lands in the middle of the view instead of
    /// the top-left corner.
    pub fn set_normalized_scroll(&mut self, x: f32, y: f32, centred: bool) {
        let pending = &mut self.viewport.pending;
        pending.normalized_x = Some(x);
        pending.normalized_y = Some(y);
        pending.scroll_with_center = centred;
        self.layout();
    }

    /// Scroll to a position in document units relative to the page origin
    pub fn set_doc_rel_scroll(&mut self, x: f32, y: f32) {
        self.viewport.pending.doc_rel_x = Some(x);
        self.viewport.pending.doc_rel_y = Some(y);
        self.layout();
    }

    /// First pointer down of a gesture
    pub fn pointer_down(&mut self) {
        self.interacting = true;
        self.viewport.scroller.force_finished();
    }

    /// Last pointer up of a gesture
    pub fn pointer_released(&mut self) {
        self.scroll_disabled = false;
        self.interacting = false;

        if !self.children.contains_key(&self.current) {
            return;
        }
        if self.viewport.scroller.is_finished() {
            self.slide_onto_screen(self.current);
        }
        if self.viewport.scroller.is_finished() {
            self.settle(self.current);
        }
    }

    /// Drag the content by `(dx, dy)` pixels
    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        if self.scroll_disabled || (dx == 0 && dy == 0) {
            return;
        }
        self.unsettle_current();
        self.viewport.add_scroll(dx, dy);
        self.layout();
    }

    /// Release velocity in px/s
    pub fn fling(&mut self, vx: f32, vy: f32) {
        if self.scroll_disabled {
            return;
        }
        let Some(bounds) = self.scroll_bounds_of(self.current) else {
            return;
        };

        match direction_of_travel(vx, vy) {
            Direction::Left if bounds.left >= 0 => {
                if self.children.contains_key(&(self.current + 1)) {
                    self.slide_onto_screen(self.current + 1);
                    return;
                }
            }
            Direction::Right if bounds.right <= 0 => {
                if self.current > 0 && self.children.contains_key(&(self.current - 1)) {
                    self.slide_onto_screen(self.current - 1);
                    return;
                }
            }
            _ => {}
        }

        self.viewport.scroller_last = ScreenOffset::default();
        let margin = self.config.fling_margin_px;
        let expanded = bounds.inset(-margin, -margin);
        if within_bounds_in_direction_of_travel(&bounds, vx, vy) && expanded.contains(0, 0) {
            self.unsettle_current();
            self.viewport.scroller.fling(vx, vy, bounds);
        }
    }

    pub fn scale_begin(&mut self, focus: ScreenOffset) {
        self.scaling = true;
        self.unsettle_current();
        self.viewport.reset_scroll();
        self.scroll_disabled = true;
        self.viewport.prev_focus = focus;
    }

    /// One pinch step; `factor` is relative to the previous step
    pub fn scale(&mut self, factor: f32, focus: ScreenOffset) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let previous = self.viewport.scale();
        let (min, max) = self.viewport.scale_bounds();
        let next = clamp_scale(previous, factor, min, max);
        self.viewport.set_scale(next);

        if self.viewport.reflow() {
            self.layout();
            return;
        }
        let Some(child) = self.children.get(&self.current) else {
            return;
        };
        let out = scroll_for_scale(
            ScreenOffset::new(child.rect.left, child.rect.top),
            previous,
            self.viewport.scale(),
            self.viewport.scroll,
            self.viewport.prev_focus,
            focus,
        );
        self.viewport.scroll = out.scroll;
        self.viewport.prev_focus = out.focus;
        self.layout();
    }

    pub fn scale_end(&mut self) {
        if self.viewport.reflow() {
            self.layout();
        } else if self.fit_width {
            self.snap_to_fit_width();
        }
        self.scaling = false;
    }

    fn snap_to_fit_width(&mut self) {
        let Some(child) = self.children.get(&self.current) else {
            return;
        };
        let (min, max) = self.viewport.scale_bounds();
        let snap = fit_width_snap(
            self.viewport.scale(),
            &self.container,
            child.intrinsic.width,
            child.intrinsic.height,
            min,
            max,
        );
        if let Some(scale) = snap {
            log::debug!("snapping scale {} to fit width {}", self.viewport.scale(), scale);
            let left = child.rect.left;
            self.viewport.set_scale(scale);
            self.viewport.scroller.force_finished();
            self.viewport.scroll = ScreenOffset::new(-left, 0);
            self.layout();
        }
    }

    /// Slide the next page onto screen
    pub fn move_to_next(&mut self) {
        if self.children.contains_key(&(self.current + 1)) {
            self.slide_onto_screen(self.current + 1);
        }
    }

    /// Slide the previous page onto screen
    pub fn move_to_previous(&mut self) {
        if self.current > 0 && self.children.contains_key(&(self.current - 1)) {
            self.slide_onto_screen(self.current - 1);
        }
    }

    /// Advance about 90% of a screen down the column, then across, then on
    /// to the next page
    pub fn smart_move_forwards(&mut self) {
        let Some(child) = self.children.get(&self.current) else {
            return;
        };
        let screen_w = self.container.available_width();
        let screen_h = self.container.available_height();
        let remaining = self.viewport.scroller.remaining();
        let scroll = self.viewport.scroll;
        let pad = self.container.padding;
        let left = -(child.rect.left + scroll.x + remaining.x) + pad.left;
        let top = -(child.rect.top + scroll.y + remaining.y) + pad.top;
        let view = ScreenRect::new(left, top, left + screen_w, top + screen_h);
        let next = self.neighbour(self.current + 1);

        let (dx, dy) = forward_offsets(
            screen_w,
            screen_h,
            remaining,
            &view,
            child.width,
            child.height,
            next,
        );
        self.start_smart_move(remaining, dx, dy);
    }

    /// Mirror of [`smart_move_forwards`](Self::smart_move_forwards)
    pub fn smart_move_backwards(&mut self) {
        let Some(child) = self.children.get(&self.current) else {
            return;
        };
        let screen_w = self.container.available_width();
        let screen_h = self.container.available_height();
        let remaining = self.viewport.scroller.remaining();
        let scroll = self.viewport.scroll;
        let pad = self.container.padding;
        let left = -(child.rect.left + scroll.x + remaining.x) + pad.left;
        let top = -(child.rect.top + scroll.y + remaining.y) + pad.top;
        let previous = self.current.checked_sub(1).and_then(|i| self.neighbour(i));

        let (dx, dy) = backward_offsets(
            screen_w,
            screen_h,
            remaining,
            left,
            top,
            child.width,
            child.height,
            previous,
        );
        self.start_smart_move(remaining, dx, dy);
    }

    fn start_smart_move(&mut self, remaining: ScreenOffset, dx: i32, dy: i32) {
        self.unsettle_current();
        self.viewport.scroller_last = ScreenOffset::default();
        self.viewport.scroller.start_scroll(
            remaining.x - dx,
            remaining.y - dy,
            self.config.slide_duration_ms,
        );
    }

    fn neighbour(&self, index: usize) -> Option<Neighbour> {
        self.children.get(&index).map(|child| Neighbour {
            left: child.rect.left,
            top: child.rect.top,
            width: child.width,
            height: child.height,
        })
    }

    /// Advance animations to `now_ms`
    pub fn step(&mut self, now_ms: u64) {
        if !self.viewport.scroller.is_finished() {
            self.viewport.scroller.compute(now_ms);
            self.viewport.consume_scroller();
            self.layout();
        } else if !self.interacting {
            self.settle(self.current);
        }
    }

    /// Capture state for persistence
    pub fn to_state(&self) -> PagerState {
        let viewport = &self.viewport;
        PagerState {
            current: self.current,
            scroll_x: viewport.scroll.x,
            scroll_y: viewport.scroll.y,
            scroller_last_x: viewport.scroller_last.x,
            scroller_last_y: viewport.scroller_last.y,
            prev_focus_x: viewport.prev_focus.x,
            prev_focus_y: viewport.prev_focus.y,
            reflow: viewport.reflow(),
            scroll_disabled: self.scroll_disabled,
            normalized_scale: self.normalized_scale(),
        }
    }

    /// Restore persisted state; `current` must already be in range
    pub fn restore_state(&mut self, state: &PagerState) {
        self.viewport.set_reflow(state.reflow);
        self.viewport.scroll = ScreenOffset::new(state.scroll_x, state.scroll_y);
        self.viewport.scroller_last = ScreenOffset::new(state.scroller_last_x, state.scroller_last_y);
        self.viewport.prev_focus = ScreenOffset::new(state.prev_focus_x, state.prev_focus_y);
        self.scroll_disabled = state.scroll_disabled;
        if state.normalized_scale.is_finite() && state.normalized_scale > 0.0 {
            self.viewport.pending.normalized_scale = Some(state.normalized_scale);
        }
        if state.current != self.current && state.current < self.adapter.count() {
            self.pending_index = Some(state.current);
        }
        self.layout();
    }

    /// Position the current page and its neighbours
    pub fn layout(&mut self) {
        let count = self.adapter.count();
        if count == 0 || self.container.width <= 0 || self.container.height <= 0 {
            return;
        }
        if self.current >= count {
            self.current = count - 1;
        }

        self.handle_switches();
        self.remove_superfluous();

        let current = self.current;
        self.ensure_child(current);
        self.measure(current);
        if !self.viewport.reflow() {
            self.apply_pending_requests();
        }

        let container = self.container;
        let idle = !self.interacting && self.viewport.scroller.is_finished();
        let scroll = self.viewport.scroll;
        self.viewport.reset_scroll();

        let cv = {
            let Some(child) = self.children.get_mut(&current) else {
                return;
            };
            let mut left = child.rect.left + scroll.x;
            let mut top = child.rect.top + scroll.y;
            if idle {
                let raw = ScreenRect::new(left, top, left + child.width, top + child.height);
                let corr = correction(&scroll_bounds(&container, &raw));
                left += corr.x;
                top += corr.y;
            }
            child.place(left, top);
            child.rect
        };
        if idle {
            self.settle(current);
        }
        let cv_offset = self.sub_screen_offset(current);

        if current > 0 {
            let index = current - 1;
            self.ensure_child(index);
            self.measure(index);
            let offset = self.sub_screen_offset(index);
            let gap = offset.x + self.config.gap_px + cv_offset.x;
            if let Some(child) = self.children.get_mut(&index) {
                let left = cv.left - child.width - gap;
                let top = (cv.bottom + cv.top - child.height) / 2;
                child.place(left, top);
            }
        }
        if current + 1 < count {
            let index = current + 1;
            self.ensure_child(index);
            self.measure(index);
            let offset = self.sub_screen_offset(index);
            let gap = cv_offset.x + self.config.gap_px + offset.x;
            if let Some(child) = self.children.get_mut(&index) {
                let left = cv.right + gap;
                let top = (cv.bottom + cv.top - child.height) / 2;
                child.place(left, top);
            }
        }

        self.render_children();
    }

    fn render_children(&mut self) {
        let view_scale = self.viewport.scale();
        let reflow = self.viewport.reflow();
        for (&page, child) in self.children.iter_mut() {
            let frame = ChildFrame {
                page,
                rect: child.rect,
                page_scale: child.page_scale(),
                view_scale,
                reflow,
            };
            child.surface.render(&frame);
        }
    }

    fn handle_switches(&mut self) {
        if let Some(pending) = self.pending_index.take() {
            self.unsettle_current();
            self.viewport.reset_scroll();
            self.switch_to(pending);
            return;
        }

        let Some(child) = self.children.get(&self.current) else {
            return;
        };
        let offset = sub_screen_size_offset(&self.container, child.width, child.height);
        let half_width = self.container.width / 2;
        let half_gap = self.config.gap_px / 2;
        let scroll_x = self.viewport.scroll.x;

        let move_next = child.rect.left + child.width + offset.x + half_gap + scroll_x < half_width
            && self.current + 1 < self.adapter.count();
        let move_previous =
            child.rect.left - offset.x - half_gap + scroll_x >= half_width && self.current > 0;

        if move_next {
            self.unsettle_current();
            self.switch_to(self.current + 1);
        } else if move_previous {
            self.unsettle_current();
            self.switch_to(self.current - 1);
        }
    }

    fn switch_to(&mut self, index: usize) {
        log::debug!("page switch {} -> {}", self.current, index);
        self.events.push(PagerEvent::MoveOffChild(self.current));
        self.current = index;
        self.events.push(PagerEvent::MoveToChild(index));
    }

    fn remove_superfluous(&mut self) {
        let count = self.adapter.count();
        let current = self.current;
        let stale: Vec<usize> = self
            .children
            .keys()
            .copied()
            .filter(|&k| k + 1 < current || k > current + 1 || k >= count)
            .collect();

        for index in stale {
            if let Some(mut child) = self.children.remove(&index) {
                log::debug!("recycling surface of page {}", index);
                child.surface.release_resources();
                if self.settled == Some(index) {
                    self.settled = None;
                }
                if self.pool.len() < self.config.pool_capacity {
                    self.pool.push_back(child.surface);
                }
            }
        }
    }

    fn ensure_child(&mut self, index: usize) {
        if self.children.contains_key(&index) {
            return;
        }
        let recycled = self.pool.pop_front();
        let surface = self.adapter.create_or_reuse(index, recycled);
        self.children.insert(index, PageChild::new(surface));
    }

    fn measure(&mut self, index: usize) {
        let container = self.container;
        let reflow = self.viewport.reflow();
        let scale = self.viewport.scale();
        if let Some(child) = self.children.get_mut(&index) {
            child.measure(&container, reflow, scale);
        }
    }

    fn sub_screen_offset(&self, index: usize) -> ScreenOffset {
        self.children.get(&index).map_or(ScreenOffset::default(), |child| {
            sub_screen_size_offset(&self.container, child.width, child.height)
        })
    }

    fn apply_pending_requests(&mut self) {
        let current = self.current;
        let Some(child) = self.children.get(&current) else {
            return;
        };
        let (iw, ih) = (child.intrinsic.width, child.intrinsic.height);
        let fill = child.fill;
        let corr = scale_correction(&self.container, iw, fill);

        if let Some(normalized) = self.viewport.pending.normalized_scale.take() {
            self.viewport.set_scale(normalized * corr);
            self.measure(current);
        }

        let Some(child) = self.children.get(&current) else {
            return;
        };
        let scale = self.viewport.scale();
        let page_scale = child.page_scale();
        let pending = &mut self.viewport.pending;
        if let Some(doc_rel_x) = pending.doc_rel_x.take() {
            pending.normalized_x = Some(normalized_from_doc_rel_x(doc_rel_x, page_scale, iw, scale, fill));
        }
        if let Some(doc_rel_y) = pending.doc_rel_y.take() {
            pending.normalized_y = Some(normalized_from_doc_rel_y(doc_rel_y, page_scale, ih, scale, fill));
        }
        if !pending.has_scroll() {
            return;
        }

        let pad = self.container.padding;
        let current_x = normalized_x(child.rect.left, pad.left, child.width);
        let current_y = normalized_y(child.rect.top, pad.top, child.height);
        let mut x = preset_pixels_from_normalized(current_x, iw, scale, fill);
        let mut y = preset_pixels_from_normalized(current_y, ih, scale, fill);
        if let Some(n) = pending.normalized_x.take() {
            x = target_pixels_from_normalized(n, iw, scale, fill, pad.left);
        }
        if let Some(n) = pending.normalized_y.take() {
            y = target_pixels_from_normalized(n, ih, scale, fill, pad.top);
        }
        if std::mem::take(&mut pending.scroll_with_center) {
            x += self.container.width / 2;
            y += self.container.height / 2;
        }

        let origin = ScreenOffset::new(child.rect.left, child.rect.top);
        self.viewport.scroller.force_finished();
        self.viewport.scroller_last = ScreenOffset::default();
        self.viewport.scroll = ScreenOffset::new(x - origin.x, y - origin.y);
    }

    /// Scroll range of a child in scroller coordinates
    fn scroll_bounds_of(&self, index: usize) -> Option<ScreenRect> {
        let child = self.children.get(&index)?;
        let scroll = self.viewport.scroll;
        let pad = self.container.padding;
        let rect = ScreenRect::new(
            child.rect.left + scroll.x - pad.left,
            child.rect.top + scroll.y - pad.top,
            child.rect.left + child.width + scroll.x + pad.right,
            child.rect.top + child.height + scroll.y + pad.bottom,
        );
        Some(scroll_bounds(&self.container, &rect))
    }

    fn slide_onto_screen(&mut self, index: usize) {
        let Some(bounds) = self.scroll_bounds_of(index) else {
            return;
        };
        let corr = correction(&bounds);
        if !corr.is_zero() {
            self.unsettle_current();
            self.viewport.scroller_last = ScreenOffset::default();
            self.viewport
                .scroller
                .start_scroll(corr.x, corr.y, self.config.slide_duration_ms);
        }
    }

    fn settle(&mut self, index: usize) {
        if self.settled != Some(index) && self.children.contains_key(&index) {
            log::debug!("page {} settled", index);
            self.settled = Some(index);
            self.events.push(PagerEvent::Settle(index));
        }
    }

    fn unsettle_current(&mut self) {
        if let Some(index) = self.settled.take() {
            log::debug!("page {} unsettled", index);
            self.events.push(PagerEvent::Unsettle(index));
        }
    }
}

/// Step down the column by about 90% of a screen
///
/// Between 80% and 95% is acceptable when it lets a whole number of steps
/// land exactly on the boundary `max` pixels away.
fn smart_advance_amount(screen_height: i32, max: i32) -> i32 {
    let mut advance = (screen_height as f32 * 0.9 + 0.5) as i32;
    if advance <= 0 {
        return max.max(0);
    }
    let left_over = max % advance;
    let steps = max / advance;
    if left_over != 0 && steps > 0 {
        let per_step = left_over as f32 / steps as f32;
        if per_step <= screen_height as f32 * 0.05 {
            advance += (per_step + 0.5) as i32;
        } else {
            let overshoot = (advance - left_over) as f32 / steps as f32;
            if overshoot <= screen_height as f32 * 0.1 {
                advance -= (overshoot + 0.5) as i32;
            }
        }
    }
    advance.min(max)
}

fn forward_offsets(
    screen_w: i32,
    screen_h: i32,
    remaining: ScreenOffset,
    view: &ScreenRect,
    doc_w: i32,
    doc_h: i32,
    next: Option<Neighbour>,
) -> (i32, i32) {
    let at_column_end = view.bottom >= doc_h || screen_h >= (0.8 * doc_h as f32) as i32;
    if !at_column_end {
        return (0, smart_advance_amount(screen_h, doc_h - view.bottom));
    }

    let at_row_end =
        view.right + (0.4 * screen_w as f32) as i32 > doc_w || screen_w >= (0.7 * doc_w as f32) as i32;
    if !at_row_end {
        return ((doc_w - view.right).min(screen_w), screen_h - view.bottom);
    }

    let Some(next) = next else {
        return (remaining.x, remaining.y);
    };
    let next_top = -(next.top + remaining.y);
    let next_left = -(next.left + remaining.x);

    let mut y = if next.height < screen_h {
        (next.height - screen_h) >> 1
    } else if screen_h >= (0.8 * doc_h as f32) as i32 {
        view.top
    } else {
        0
    };

    let mut x = if next.width < screen_w {
        (next.width - screen_w) >> 1
    } else {
        let mut x = if screen_w >= (0.7 * doc_w as f32) as i32 {
            view.left
        } else {
            0
        };
        if x + screen_w > next.width {
            x = next.width - screen_w;
        }
        x
    };
    x -= next_left;
    y -= next_top;
    (x, y)
}

#[allow(clippy::too_many_arguments)]
fn backward_offsets(
    screen_w: i32,
    screen_h: i32,
    remaining: ScreenOffset,
    left: i32,
    top: i32,
    doc_w: i32,
    doc_h: i32,
    previous: Option<Neighbour>,
) -> (i32, i32) {
    let at_column_start = top <= 0 || screen_h >= (0.8 * doc_h as f32) as i32;
    if !at_column_start {
        return (0, -smart_advance_amount(screen_h, top));
    }

    let at_row_start = left < (0.4 * screen_w as f32) as i32 || screen_w >= (0.7 * doc_w as f32) as i32;
    if !at_row_start {
        return (-left.min(screen_w), -top.min(screen_h));
    }

    let Some(previous) = previous else {
        return (remaining.x, remaining.y);
    };
    let previous_top = -(previous.top + remaining.y);
    let previous_left = -(previous.left + remaining.x);

    let mut y = if previous.height < screen_h {
        (previous.height - screen_h) >> 1
    } else if screen_h >= (0.8 * doc_h as f32) as i32 {
        top
    } else {
        (previous.height - screen_h).max(0)
    };

    let mut x = if previous.width < screen_w {
        (previous.width - screen_w) >> 1
    } else {
        let x = if screen_w >= (0.7 * doc_w as f32) as i32 {
            left
        } else {
            previous.width - screen_w
        };
        x.max(0)
    };
    x -= previous_left;
    y -= previous_top;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Log {
        created: Vec<(usize, bool)>,
        released: Vec<usize>,
    }

    struct FakeSurface {
        page: usize,
        size: DocSize,
        log: Rc<RefCell<Log>>,
        last_frame: Option<ChildFrame>,
    }

    impl PageSurface for FakeSurface {
        fn measure(&self) -> DocSize {
            self.size
        }

        fn render(&mut self, frame: &ChildFrame) {
            self.last_frame = Some(*frame);
        }

        fn release_resources(&mut self) {
            self.log.borrow_mut().released.push(self.page);
            self.last_frame = None;
        }
    }

    struct FakeAdapter {
        count: usize,
        size: DocSize,
        log: Rc<RefCell<Log>>,
    }

    impl PageAdapter for FakeAdapter {
        type Surface = FakeSurface;

        fn count(&self) -> usize {
            self.count
        }

        fn create_or_reuse(&mut self, index: usize, recycled: Option<FakeSurface>) -> FakeSurface {
            self.log.borrow_mut().created.push((index, recycled.is_some()));
            match recycled {
                Some(mut surface) => {
                    surface.page = index;
                    surface
                }
                None => FakeSurface {
                    page: index,
                    size: self.size,
                    log: self.log.clone(),
                    last_frame: None,
                },
            }
        }
    }

    /// Ten 500x800 pages in a 1000x800 view: pages fit at scale 1, centred
    fn pager() -> (Pager<FakeAdapter>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let adapter = FakeAdapter {
            count: 10,
            size: DocSize::new(500.0, 800.0),
            log: log.clone(),
        };
        let mut pager = Pager::new(adapter, PagerConfig::default());
        pager.set_container(Container::new(1000, 800));
        (pager, log)
    }

    fn run_animation(pager: &mut Pager<FakeAdapter>, from_ms: u64) {
        let mut now = from_ms;
        pager.step(now);
        while pager.is_animating() && now < from_ms + 10_000 {
            now += 16;
            pager.step(now);
        }
        pager.step(now + 16);
    }

    #[test]
    fn test_initial_layout_centres_page() {
        let (mut pager, _) = pager();
        assert_eq!(pager.child_indices(), vec![0, 1]);
        assert_eq!(pager.child_rect(0), Some(ScreenRect::new(250, 0, 750, 800)));
        // gap = both sub-screen offsets plus the fixed gap
        assert_eq!(pager.child_rect(1).map(|r| r.left), Some(750 + 250 + 20 + 250));
        assert_eq!(pager.drain_events(), vec![PagerEvent::Settle(0)]);
        assert!(pager.is_settled());

        let frame = pager.current_frame().unwrap();
        assert!((frame.scale - 1.0).abs() < 1e-6);
        assert_eq!(frame.left, 250.0);
    }

    #[test]
    fn test_drag_past_midpoint_switches_page() {
        let (mut pager, _) = pager();
        pager.drain_events();

        pager.pointer_down();
        pager.scroll_by(-800, 0);
        assert_eq!(pager.current(), 1);
        assert_eq!(
            pager.drain_events(),
            vec![
                PagerEvent::Unsettle(0),
                PagerEvent::MoveOffChild(0),
                PagerEvent::MoveToChild(1)
            ]
        );

        pager.pointer_released();
        assert!(pager.is_animating());
        run_animation(&mut pager, 1_000);
        assert_eq!(pager.child_rect(1).map(|r| r.left), Some(250));
        assert!(pager.drain_events().contains(&PagerEvent::Settle(1)));
    }

    #[test]
    fn test_small_drag_springs_back() {
        let (mut pager, _) = pager();
        pager.pointer_down();
        pager.scroll_by(-100, 30);
        assert_eq!(pager.current(), 0);
        pager.pointer_released();
        run_animation(&mut pager, 0);
        assert_eq!(pager.child_rect(0), Some(ScreenRect::new(250, 0, 750, 800)));
    }

    #[test]
    fn test_fling_left_slides_next_page() {
        let (mut pager, _) = pager();
        pager.fling(-3_000.0, 0.0);
        assert!(pager.is_animating());
        run_animation(&mut pager, 0);
        assert_eq!(pager.current(), 1);
        assert_eq!(pager.child_rect(1).map(|r| r.left), Some(250));
    }

    #[test]
    fn test_fling_ignored_while_scroll_disabled() {
        let (mut pager, _) = pager();
        pager.scale_begin(ScreenOffset::new(500, 400));
        pager.fling(-3_000.0, 0.0);
        assert!(!pager.is_animating());
    }

    #[test]
    fn test_fling_within_zoomed_page() {
        let (mut pager, _) = pager();
        pager.set_scale(3.0);
        assert!(pager.child_rect(0).unwrap().height() > 800);
        let before = pager.child_rect(0).unwrap();

        // vertical fling scrolls inside the page, clamped to its bounds
        pager.fling(0.0, -4_000.0);
        assert!(pager.is_animating());
        run_animation(&mut pager, 0);
        let after = pager.child_rect(0).unwrap();
        assert!(after.top < before.top);
        assert!(after.bottom >= 800);
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn test_pinch_keeps_focus_point() {
        let (mut pager, _) = pager();
        pager.pointer_down();
        let focus = ScreenOffset::new(500, 400);
        pager.scale_begin(focus);
        let before = pager.current_frame().unwrap();
        let doc_x = (500.0 - before.left) / before.scale;

        pager.scale(2.0, focus);
        let after = pager.current_frame().unwrap();
        assert!((pager.scale() - 2.0).abs() < 1e-6);
        let doc_x_after = (500.0 - after.left) / after.scale;
        assert!((doc_x - doc_x_after).abs() < 1.0);

        pager.scale_end();
        assert!(!pager.is_scaling());
    }

    #[test]
    fn test_scale_is_clamped_and_reflow_halves_bounds() {
        let (mut pager, _) = pager();
        pager.scale_begin(ScreenOffset::new(0, 0));
        pager.scale(50.0, ScreenOffset::new(0, 0));
        assert_eq!(pager.scale(), 10.0);
        pager.scale_end();

        pager.set_reflow(true);
        assert_eq!(pager.scale(), 5.0);
        assert_eq!(pager.viewport().scale_bounds(), (0.5, 5.0));
    }

    #[test]
    fn test_fit_width_snap_on_scale_end() {
        let (mut pager, _) = pager();
        pager.set_fit_width(true);
        pager.pointer_down();
        pager.scale_begin(ScreenOffset::new(500, 400));
        pager.scale(1.9, ScreenOffset::new(500, 400));
        pager.scale_end();

        // 500 px page in a 1000 px view: fit width is 2x
        assert!((pager.scale() - 2.0).abs() < 1e-4);
        assert_eq!(pager.child_rect(0).map(|r| r.left), Some(0));
    }

    #[test]
    fn test_jump_recycles_far_children() {
        let (mut pager, log) = pager();
        pager.drain_events();
        pager.set_displayed_index(5);

        assert_eq!(pager.current(), 5);
        assert_eq!(pager.child_indices(), vec![4, 5, 6]);
        let events = pager.drain_events();
        assert!(events.contains(&PagerEvent::Unsettle(0)));
        assert!(events.contains(&PagerEvent::MoveOffChild(0)));
        assert!(events.contains(&PagerEvent::MoveToChild(5)));

        let log = log.borrow();
        let mut released = log.released.clone();
        released.sort_unstable();
        assert_eq!(released, vec![0, 1]);
        // both released surfaces were reused for the new window
        let reused = log.created.iter().filter(|(_, recycled)| *recycled).count();
        assert_eq!(reused, 2);
    }

    #[test]
    fn test_out_of_range_jump_is_ignored() {
        let (mut pager, _) = pager();
        pager.set_displayed_index(10);
        assert_eq!(pager.current(), 0);
    }

    #[test]
    fn test_normalized_scroll_requests() {
        let (mut pager, _) = pager();
        pager.set_normalized_scale(2.0);
        // fit-to-width of this page is 2x, so twice fit-to-width is 4x
        assert!((pager.scale() - 4.0).abs() < 1e-4);
        assert!((pager.normalized_scale() - 2.0).abs() < 1e-4);

        pager.pointer_down();
        pager.set_normalized_scroll(-0.25, -0.5, false);
        assert!((pager.normalized_x_scroll() + 0.25).abs() < 1e-2);
        assert!((pager.normalized_y_scroll() + 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_doc_rel_scroll() {
        let (mut pager, _) = pager();
        pager.set_scale(2.0);
        pager.pointer_down();
        pager.set_doc_rel_scroll(100.0, 200.0);
        let frame = pager.current_frame().unwrap();
        // the document point (100, 200) is now at the view's top-left
        assert!((frame.left + 100.0 * frame.scale).abs() <= 2.0);
        assert!((frame.top + 200.0 * frame.scale).abs() <= 2.0);
    }

    #[test]
    fn test_smart_move_advances_down_the_column() {
        let (mut pager, _) = pager();
        pager.set_scale(3.0);
        let top = pager.child_rect(0).unwrap().top;

        pager.smart_move_forwards();
        run_animation(&mut pager, 0);
        let moved = top - pager.child_rect(0).unwrap().top;
        assert!(moved >= (800.0 * 0.8) as i32 && moved <= (800.0 * 0.95) as i32 + 1);
        assert_eq!(pager.current(), 0);

        pager.smart_move_backwards();
        run_animation(&mut pager, 20_000);
        assert_eq!(pager.child_rect(0).unwrap().top, top);
    }

    #[test]
    fn test_smart_advance_amount() {
        // exact multiple of the 90% step
        assert_eq!(smart_advance_amount(1000, 1800), 900);
        // short remainder spread over the steps
        assert_eq!(smart_advance_amount(1000, 1840), 920);
        // never beyond the boundary
        assert_eq!(smart_advance_amount(1000, 300), 300);
    }

    #[test]
    fn test_state_round_trip() {
        let (mut pager, _) = pager();
        pager.set_displayed_index(3);
        pager.set_scale(2.0);
        let state = pager.to_state();
        assert_eq!(state.current, 3);

        let (mut restored, _) = self::pager();
        restored.restore_state(&state);
        assert_eq!(restored.current(), 3);
        assert!((restored.normalized_scale() - state.normalized_scale).abs() < 1e-4);
    }
}
