//! Direct manipulation of a selected text annotation
//!
//! Provides the selection box handles (four resize corners and a move handle
//! centred on the top edge), the rectangle clamp applied on every drag step,
//! and [`TextAnnotationManipulator`], the per-gesture state machine that turns
//! a drag on the selected box into a preview and finally a commit.
//!
//! Handles keep a fixed on-screen size, so their document-space extent is
//! `half_px / scale`.

use crate::annotation::{AnnotationRef, Selection};
use crate::config::GestureConfig;
use crate::geometry::{DocRect, DocSize, PageCoordinate, ScreenPoint};

/// Type of manipulation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Drag handle centred on the top edge
    Move,
}

impl HandleKind {
    pub const ALL: [HandleKind; 5] = [
        HandleKind::TopLeft,
        HandleKind::TopRight,
        HandleKind::BottomLeft,
        HandleKind::BottomRight,
        HandleKind::Move,
    ];

    pub fn is_corner(&self) -> bool {
        !matches!(self, HandleKind::Move)
    }

    /// Centre of this handle on `bounds`
    pub fn anchor(&self, bounds: &DocRect) -> PageCoordinate {
        match self {
            HandleKind::TopLeft => PageCoordinate::new(bounds.left, bounds.top),
            HandleKind::TopRight => PageCoordinate::new(bounds.right, bounds.top),
            HandleKind::BottomLeft => PageCoordinate::new(bounds.left, bounds.bottom),
            HandleKind::BottomRight => PageCoordinate::new(bounds.right, bounds.bottom),
            HandleKind::Move => PageCoordinate::new((bounds.left + bounds.right) * 0.5, bounds.top),
        }
    }
}

/// Pixel sizes of the selection box handles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleMetrics {
    pub corner_half_px: f32,
    pub move_half_px: f32,
    pub min_edge_px: f32,
    pub grab_slop_px: f32,
}

impl HandleMetrics {
    pub fn from_config(config: &GestureConfig) -> Self {
        Self {
            corner_half_px: config.corner_handle_half_px(),
            move_half_px: config.move_handle_half_px(),
            min_edge_px: config.min_edge_px(),
            grab_slop_px: config.grab_slop_px(),
        }
    }
}

impl Default for HandleMetrics {
    fn default() -> Self {
        Self::from_config(&GestureConfig::default())
    }
}

/// Hit rectangle of `handle` in document space
///
/// Returns `None` for a non-positive scale.
pub fn handle_rect(
    metrics: &HandleMetrics,
    scale: f32,
    bounds: &DocRect,
    handle: HandleKind,
) -> Option<DocRect> {
    if scale <= 0.0 {
        return None;
    }
    let half_px = match handle {
        HandleKind::Move => metrics.move_half_px,
        _ => metrics.corner_half_px,
    };
    let half = half_px / scale;
    let center = handle.anchor(bounds);
    Some(DocRect::new(
        center.x - half,
        center.y - half,
        center.x + half,
        center.y + half,
    ))
}

/// Which handle, if any, `point` grabs
///
/// A touch that starts inside the box never picks a corner, so resizing has
/// to be deliberate. Corners are only candidates when `resize_enabled`. When
/// several handle rectangles contain the point the nearest centre wins.
pub fn hit_test_handle(
    metrics: &HandleMetrics,
    scale: f32,
    bounds: &DocRect,
    point: &PageCoordinate,
    resize_enabled: bool,
) -> Option<HandleKind> {
    if scale <= 0.0 {
        return None;
    }
    let inside = bounds.contains_point(point);

    HandleKind::ALL
        .iter()
        .copied()
        .filter(|handle| !handle.is_corner() || (resize_enabled && !inside))
        .filter(|handle| {
            handle_rect(metrics, scale, bounds, *handle)
                .is_some_and(|rect| rect.contains_point(point))
        })
        .map(|handle| (handle, handle.anchor(bounds).distance_to(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(handle, _)| handle)
}

/// Normalize `rect`, enforce `min_edge` and keep it inside the page
///
/// Too-small edges grow around their centre. Overflow shifts the box back
/// onto the page before anything is clipped, so size is preserved whenever
/// the page is large enough; the minimum is enforced again after clipping.
pub fn clamp_and_normalize(rect: &DocRect, page: DocSize, min_edge: f32) -> DocRect {
    let r = rect.normalized();
    let (mut left, mut top, mut right, mut bottom) = (r.left, r.top, r.right, r.bottom);

    if right - left < min_edge {
        let cx = (left + right) * 0.5;
        left = cx - min_edge * 0.5;
        right = cx + min_edge * 0.5;
    }
    if bottom - top < min_edge {
        let cy = (top + bottom) * 0.5;
        top = cy - min_edge * 0.5;
        bottom = cy + min_edge * 0.5;
    }

    if left < 0.0 {
        right -= left;
        left = 0.0;
    }
    if top < 0.0 {
        bottom -= top;
        top = 0.0;
    }
    if right > page.width {
        left -= right - page.width;
        right = page.width;
    }
    if bottom > page.height {
        top -= bottom - page.height;
        bottom = page.height;
    }

    left = left.max(0.0);
    top = top.max(0.0);
    right = right.min(page.width);
    bottom = bottom.min(page.height);

    if right - left < min_edge {
        right = page.width.min(left + min_edge);
    }
    if bottom - top < min_edge {
        bottom = page.height.min(top + min_edge);
    }

    DocRect::new(left, top, right, bottom)
}

/// What a manipulation gesture does to the box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulationKind {
    Move,
    Resize(HandleKind),
}

/// Pointer position in both coordinate spaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub screen: ScreenPoint,
    pub doc: PageCoordinate,
    pub time_ms: u64,
}

impl PointerSample {
    pub fn new(screen: ScreenPoint, doc: PageCoordinate, time_ms: u64) -> Self {
        Self {
            screen,
            doc,
            time_ms,
        }
    }
}

/// Page geometry the manipulator clamps against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub size: DocSize,
    pub scale: f32,
}

/// Result of feeding a drag step to the manipulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollOutcome {
    /// Not a manipulation; the drag should pan the page
    NotHandled,
    /// The selection is locked; the drag is consumed without effect
    Locked,
    /// Live candidate rectangle for the selection box
    Preview(DocRect),
}

/// Rectangle change to write back to the document engine
#[derive(Debug, Clone, PartialEq)]
pub struct RectCommit {
    pub target: AnnotationRef,
    pub from: DocRect,
    pub to: DocRect,
    pub kind: ManipulationKind,
}

/// Result of the pointer going up
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    Nothing,
    /// A long-press-and-release inside the box armed the next drag to move it
    ArmedMove,
    Commit(RectCommit),
}

#[derive(Debug, Clone)]
struct ActiveManipulation {
    kind: ManipulationKind,
    target: AnnotationRef,
    start_bounds: DocRect,
    current_bounds: DocRect,
    start_doc: PageCoordinate,
}

/// Move/resize state machine for the selected text annotation
#[derive(Debug, Clone)]
pub struct TextAnnotationManipulator {
    metrics: HandleMetrics,
    require_move_arming: bool,
    move_arm_window_ms: u64,
    move_arm_slop_px: f32,
    move_start_slop_px: f32,
    long_press_timeout_ms: u64,
    resize_enabled: bool,

    active: Option<ActiveManipulation>,
    move_armed_until_ms: Option<u64>,
    down: Option<PointerSample>,
    down_inside_selected: bool,
    moved_since_down: bool,
    manipulated_this_gesture: bool,
    locked_this_gesture: bool,
}

impl TextAnnotationManipulator {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            metrics: HandleMetrics::from_config(config),
            require_move_arming: config.require_move_arming,
            move_arm_window_ms: config.move_arm_window_ms,
            move_arm_slop_px: config.move_arm_slop_px,
            move_start_slop_px: config.move_start_slop_px,
            long_press_timeout_ms: config.long_press_timeout_ms,
            resize_enabled: false,
            active: None,
            move_armed_until_ms: None,
            down: None,
            down_inside_selected: false,
            moved_since_down: false,
            manipulated_this_gesture: false,
            locked_this_gesture: false,
        }
    }

    pub fn metrics(&self) -> &HandleMetrics {
        &self.metrics
    }

    /// Enable corner handles
    pub fn set_resize_enabled(&mut self, enabled: bool) {
        self.resize_enabled = enabled;
    }

    pub fn resize_enabled(&self) -> bool {
        self.resize_enabled
    }

    /// Whether a move or resize is in progress
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_move_armed(&self, now_ms: u64) -> bool {
        self.move_armed_until_ms.is_some_and(|until| now_ms <= until)
    }

    /// Handle under `point` on the selection, honouring the resize toggle
    pub fn handle_at(&self, selection: &Selection, point: &PageCoordinate, scale: f32) -> Option<HandleKind> {
        hit_test_handle(&self.metrics, scale, &selection.bounds, point, self.resize_enabled)
    }

    /// Whether `point` lies in the grab area of the selected box
    ///
    /// The grab area is the box grown by the grab slop, plus its handles.
    pub fn grabs(&self, selection: &Selection, point: &PageCoordinate, scale: f32) -> bool {
        if scale <= 0.0 || !selection.is_manipulable_text() {
            return false;
        }
        let slop = self.metrics.grab_slop_px / scale;
        selection.bounds.expanded(slop).contains_point(point)
            || self.handle_at(selection, point, scale).is_some()
    }

    /// Start of a new gesture; drops any leftover manipulation
    pub fn on_down(&mut self, sample: PointerSample, selection: Option<&Selection>, scale: f32) {
        self.active = None;
        self.down = Some(sample);
        self.moved_since_down = false;
        self.manipulated_this_gesture = false;
        self.locked_this_gesture = false;
        self.down_inside_selected = selection
            .filter(|s| s.is_manipulable_text() && scale > 0.0)
            .is_some_and(|s| {
                self.handle_at(s, &sample.doc, scale).is_none() && s.bounds.contains_point(&sample.doc)
            });
    }

    /// Raw pointer movement, tracked for move arming
    pub fn on_move(&mut self, sample: PointerSample) {
        if self.moved_since_down {
            return;
        }
        if let Some(down) = self.down {
            self.moved_since_down = down.screen.exceeds_slop(&sample.screen, self.move_arm_slop_px);
        }
    }

    /// A drag step from `start` (the gesture's down sample) to `current`
    pub fn on_scroll(
        &mut self,
        start: PointerSample,
        current: PointerSample,
        selection: Option<&Selection>,
        frame: PageFrame,
    ) -> ScrollOutcome {
        if frame.scale <= 0.0 {
            return ScrollOutcome::NotHandled;
        }

        if self.active.is_none() {
            let Some(selection) = selection.filter(|s| s.is_manipulable_text()) else {
                return ScrollOutcome::NotHandled;
            };
            let Some(target) = selection.target() else {
                return ScrollOutcome::NotHandled;
            };
            let Some(kind) = self.begin_kind(selection, &start, frame.scale) else {
                return ScrollOutcome::NotHandled;
            };

            if selection.locked {
                if !self.locked_this_gesture {
                    log::warn!("refusing to manipulate locked annotation {}", target);
                }
                self.locked_this_gesture = true;
                return ScrollOutcome::Locked;
            }

            log::debug!(
                "start {:?} on {} from ({}, {})",
                kind,
                target,
                start.doc.x,
                start.doc.y
            );
            self.move_armed_until_ms = None;
            self.manipulated_this_gesture = true;
            self.active = Some(ActiveManipulation {
                kind,
                target,
                start_bounds: selection.bounds,
                current_bounds: selection.bounds,
                start_doc: start.doc,
            });
        }

        let min_edge = self.metrics.min_edge_px / frame.scale;
        let Some(active) = self.active.as_mut() else {
            return ScrollOutcome::NotHandled;
        };

        let dx = current.doc.x - active.start_doc.x;
        let dy = current.doc.y - active.start_doc.y;
        let start = active.start_bounds;
        let candidate = match active.kind {
            ManipulationKind::Move | ManipulationKind::Resize(HandleKind::Move) => start.offset(dx, dy),
            ManipulationKind::Resize(HandleKind::TopLeft) => {
                DocRect::new(start.left + dx, start.top + dy, start.right, start.bottom)
            }
            ManipulationKind::Resize(HandleKind::TopRight) => {
                DocRect::new(start.left, start.top + dy, start.right + dx, start.bottom)
            }
            ManipulationKind::Resize(HandleKind::BottomLeft) => {
                DocRect::new(start.left + dx, start.top, start.right, start.bottom + dy)
            }
            ManipulationKind::Resize(HandleKind::BottomRight) => {
                DocRect::new(start.left, start.top, start.right + dx, start.bottom + dy)
            }
        };

        active.current_bounds = clamp_and_normalize(&candidate, frame.size, min_edge);
        ScrollOutcome::Preview(active.current_bounds)
    }

    /// How a drag starting at `start` would manipulate `selection`, if at all
    fn begin_kind(&self, selection: &Selection, start: &PointerSample, scale: f32) -> Option<ManipulationKind> {
        match self.handle_at(selection, &start.doc, scale) {
            Some(HandleKind::Move) => return Some(ManipulationKind::Move),
            Some(corner) => return Some(ManipulationKind::Resize(corner)),
            None => {}
        }

        if self.require_move_arming {
            if !self.is_move_armed(start.time_ms) {
                return None;
            }
            let slop = self.move_start_slop_px / scale;
            return selection
                .bounds
                .expanded(slop)
                .contains_point(&start.doc)
                .then_some(ManipulationKind::Move);
        }

        let slop = self.metrics.grab_slop_px / scale;
        selection
            .bounds
            .expanded(slop)
            .contains_point(&start.doc)
            .then_some(ManipulationKind::Move)
    }

    /// A second pointer went down; the manipulation hands over to pinch-zoom
    ///
    /// Returns the rectangle to restore the selection box to.
    pub fn on_secondary_down(&mut self) -> Option<DocRect> {
        self.active.take().map(|active| active.start_bounds)
    }

    /// Gesture cancelled; returns the rectangle to restore
    pub fn on_cancel(&mut self) -> Option<DocRect> {
        self.down = None;
        self.active.take().map(|active| active.start_bounds)
    }

    /// Pointer up at `time_ms`
    pub fn on_up(&mut self, time_ms: u64) -> Release {
        let down = self.down.take();
        let Some(active) = self.active.take() else {
            if self.require_move_arming && self.down_inside_selected && !self.moved_since_down {
                let held = down.map_or(0, |d| time_ms.saturating_sub(d.time_ms));
                if held >= self.long_press_timeout_ms {
                    let until = time_ms + self.move_arm_window_ms;
                    log::debug!("armed move until {} (held {} ms)", until, held);
                    self.move_armed_until_ms = Some(until);
                    return Release::ArmedMove;
                }
            }
            return Release::Nothing;
        };

        self.move_armed_until_ms = None;
        log::debug!(
            "commit {:?} on {}: {:?} -> {:?}",
            active.kind,
            active.target,
            active.start_bounds,
            active.current_bounds
        );
        Release::Commit(RectCommit {
            target: active.target,
            from: active.start_bounds,
            to: active.current_bounds,
            kind: active.kind,
        })
    }

    /// Whether a fling starting at `start` must not navigate pages
    ///
    /// True when it starts on or near the selected text annotation (or one of
    /// its handles), or when this gesture already moved or resized it.
    pub fn fling_suppressed(&self, start: &PageCoordinate, selection: Option<&Selection>, scale: f32) -> bool {
        if self.manipulated_this_gesture || self.locked_this_gesture {
            return true;
        }
        selection.is_some_and(|s| self.grabs(s, start, scale))
    }

    /// Whether the current gesture was consumed by the locked-annotation path
    pub fn locked_this_gesture(&self) -> bool {
        self.locked_this_gesture
    }
}
