//! Coordinate transform
//!
//! Stateless mapping between document space and screen space, plus the
//! pager's layout arithmetic: fit-to-screen scales, scroll bounds, settle
//! corrections and normalized scroll values. Every function here is pure so
//! it stays valid mid-gesture while scale and scroll are animating.

use pdf_reader_core::{DocSize, PageCoordinate, ScreenOffset, ScreenPoint, ScreenRect};
use serde::{Deserialize, Serialize};

/// Placement of a page on screen
///
/// `left`/`top` is the screen position of the page's document origin and
/// `scale` converts document units to screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenFrame {
    pub left: f32,
    pub top: f32,
    pub scale: f32,
}

impl ScreenFrame {
    pub fn new(left: f32, top: f32, scale: f32) -> Self {
        Self { left, top, scale }
    }
}

/// Map a screen point into the page's document space
///
/// Returns `None` for a degenerate (non-positive) scale.
pub fn screen_to_doc(point: ScreenPoint, frame: &ScreenFrame) -> Option<PageCoordinate> {
    if frame.scale <= 0.0 {
        return None;
    }
    Some(PageCoordinate::new(
        (point.x - frame.left) / frame.scale,
        (point.y - frame.top) / frame.scale,
    ))
}

/// Map a document point onto the screen
pub fn doc_to_screen(point: PageCoordinate, frame: &ScreenFrame) -> Option<ScreenPoint> {
    if frame.scale <= 0.0 {
        return None;
    }
    Some(ScreenPoint::new(
        point.x * frame.scale + frame.left,
        point.y * frame.scale + frame.top,
    ))
}

/// Padding inside the pager container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Size and padding of the view hosting the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Container {
    pub width: i32,
    pub height: i32,
    pub padding: Padding,
}

impl Container {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            padding: Padding::default(),
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Width available to a page (excluding padding)
    pub fn available_width(&self) -> i32 {
        self.width - self.padding.left - self.padding.right
    }

    /// Height available to a page (excluding padding)
    pub fn available_height(&self) -> i32 {
        self.height - self.padding.top - self.padding.bottom
    }
}

/// Scale at which a `width` x `height` child fits the available area
pub fn fill_screen_scale(container: &Container, width: i32, height: i32) -> f32 {
    if width <= 0 || height <= 0 {
        return 1.0;
    }
    let available_w = container.available_width() as f32;
    let available_h = container.available_height() as f32;
    (available_w / width as f32).min(available_h / height as f32)
}

/// Ratio between fit-to-width and fit-to-screen for a child
pub fn scale_correction(container: &Container, width: i32, fill_scale: f32) -> f32 {
    let denominator = width as f32 * fill_scale;
    if denominator <= 0.0 {
        return 1.0;
    }
    container.available_width() as f32 / denominator
}

/// View scale expressed relative to fit-to-width
pub fn normalized_scale(current_scale: f32, container: &Container, width: i32, height: i32) -> f32 {
    let fill = fill_screen_scale(container, width, height);
    let correction = scale_correction(container, width, fill);
    if correction <= 0.0 {
        return current_scale;
    }
    current_scale / correction
}

/// Range of scroll offsets that keep a child covering the screen
///
/// When the child is smaller than the container on an axis, both ends of
/// that axis collapse onto their midpoint.
pub fn scroll_bounds(container: &Container, child: &ScreenRect) -> ScreenRect {
    let mut xmin = container.width - child.right;
    let mut xmax = -child.left;
    let mut ymin = container.height - child.bottom;
    let mut ymax = -child.top;
    if xmin > xmax {
        xmin = (xmin + xmax) / 2;
        xmax = xmin;
    }
    if ymin > ymax {
        ymin = (ymin + ymax) / 2;
        ymax = ymin;
    }
    ScreenRect::new(xmin, ymin, xmax, ymax)
}

/// Smallest shift that brings zero inside `bounds`
pub fn correction(bounds: &ScreenRect) -> ScreenOffset {
    ScreenOffset::new(
        0.max(bounds.left).min(bounds.right),
        0.max(bounds.top).min(bounds.bottom),
    )
}

/// Margin around a child smaller than the container
pub fn sub_screen_size_offset(container: &Container, width: i32, height: i32) -> ScreenOffset {
    ScreenOffset::new(
        ((container.width - width) / 2).max(0),
        ((container.height - height) / 2).max(0),
    )
}

pub fn normalized_x(child_left: i32, padding_left: i32, child_width: i32) -> f32 {
    if child_width == 0 {
        return 0.0;
    }
    (child_left - padding_left) as f32 / child_width as f32
}

pub fn normalized_y(child_top: i32, padding_top: i32, child_height: i32) -> f32 {
    if child_height == 0 {
        return 0.0;
    }
    (child_top - padding_top) as f32 / child_height as f32
}

/// Pixel offset of the current normalized position, without padding
pub fn preset_pixels_from_normalized(normalized: f32, extent: i32, view_scale: f32, fill_scale: f32) -> i32 {
    (normalized * extent as f32 * view_scale * fill_scale) as i32
}

/// Pixel position of a requested normalized position, including padding
pub fn target_pixels_from_normalized(
    normalized: f32,
    extent: i32,
    view_scale: f32,
    fill_scale: f32,
    padding: i32,
) -> i32 {
    preset_pixels_from_normalized(normalized, extent, view_scale, fill_scale) + padding
}

/// Convert a document-relative X position into a normalized scroll
pub fn normalized_from_doc_rel_x(
    doc_rel_x: f32,
    page_scale: f32,
    child_width: i32,
    view_scale: f32,
    fill_scale: f32,
) -> f32 {
    if child_width == 0 {
        return 0.0;
    }
    -doc_rel_x * page_scale / (child_width as f32 * view_scale * fill_scale)
}

pub fn normalized_from_doc_rel_y(
    doc_rel_y: f32,
    page_scale: f32,
    child_height: i32,
    view_scale: f32,
    fill_scale: f32,
) -> f32 {
    if child_height == 0 {
        return 0.0;
    }
    -doc_rel_y * page_scale / (child_height as f32 * view_scale * fill_scale)
}

/// Minimum-zoom layout of a page inside its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinZoom {
    /// Document-to-pixel scale at minimum zoom
    pub source_scale: f32,
    pub width: i32,
    pub height: i32,
}

/// Fit `page` into `parent_width` x `parent_height`
///
/// Non-positive page extents fall back to the parent extents, and those to 1.
pub fn min_zoom(page: DocSize, parent_width: f32, parent_height: f32) -> MinZoom {
    let mut w = if page.width > 0.0 { page.width } else { parent_width };
    let mut h = if page.height > 0.0 { page.height } else { parent_height };
    if w <= 0.0 {
        w = 1.0;
    }
    if h <= 0.0 {
        h = 1.0;
    }

    let source_scale = (parent_width / w).min(parent_height / h);
    MinZoom {
        source_scale,
        width: (w * source_scale) as i32,
        height: (h * source_scale) as i32,
    }
}

/// Clamp `current * factor` into `[min, max]`
pub fn clamp_scale(current: f32, factor: f32, min: f32, max: f32) -> f32 {
    (current * factor).max(min).min(max)
}

/// Scroll that keeps the pinch focus under the fingers after a scale change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusScroll {
    pub scroll: ScreenOffset,
    pub focus: ScreenOffset,
}

/// Recompute scroll for a scale change from `previous_scale` to `new_scale`
///
/// `child_origin` is the laid-out top-left corner of the current child,
/// `previous_focus` the focus of the previous scale step.
pub fn scroll_for_scale(
    child_origin: ScreenOffset,
    previous_scale: f32,
    new_scale: f32,
    scroll: ScreenOffset,
    previous_focus: ScreenOffset,
    focus: ScreenOffset,
) -> FocusScroll {
    let factor = if previous_scale > 0.0 {
        new_scale / previous_scale
    } else {
        1.0
    };
    let view_focus_x = focus.x - (child_origin.x + scroll.x);
    let view_focus_y = focus.y - (child_origin.y + scroll.y);
    let x = scroll.x + view_focus_x - (view_focus_x as f32 * factor) as i32 - previous_focus.x + focus.x;
    let y = scroll.y + view_focus_y - (view_focus_y as f32 * factor) as i32 - previous_focus.y + focus.y;
    FocusScroll {
        scroll: ScreenOffset::new(x, y),
        focus,
    }
}

/// Tolerance for float error when comparing against the fit-width threshold
const SNAP_EPSILON: f32 = 1e-4;

/// Fit-width scale to snap to at the end of a pinch, if close enough
///
/// Snaps when the current scale is within 0.15 of the fit-width scale and
/// the fit-width scale is at least 1.15 (otherwise fit-to-screen already
/// shows the full width).
pub fn fit_width_snap(
    current_scale: f32,
    container: &Container,
    width: i32,
    height: i32,
    min_scale: f32,
    max_scale: f32,
) -> Option<f32> {
    let fill = fill_screen_scale(container, width, height);
    let denominator = width as f32 * fill;
    if denominator <= 0.0 {
        return None;
    }
    let fit_width_scale = container.width as f32 / denominator;
    if (current_scale - fit_width_scale).abs() <= 0.15 + SNAP_EPSILON
        && fit_width_scale >= 1.15 - SNAP_EPSILON
    {
        return Some(fit_width_scale.max(min_scale).min(max_scale));
    }
    None
}

/// Dominant direction of a fling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Diagonal,
    Left,
    Right,
    Up,
    Down,
}

/// Classify a velocity; an axis dominates when it is three times the other
pub fn direction_of_travel(vx: f32, vy: f32) -> Direction {
    if vx.abs() > 3.0 * vy.abs() {
        if vx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if vy.abs() > 3.0 * vx.abs() {
        if vy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    } else {
        Direction::Diagonal
    }
}

/// Whether a fling in direction `(vx, vy)` still has room inside `bounds`
pub fn within_bounds_in_direction_of_travel(bounds: &ScreenRect, vx: f32, vy: f32) -> bool {
    match direction_of_travel(vx, vy) {
        Direction::Diagonal => bounds.contains(0, 0),
        Direction::Left => bounds.left <= 0,
        Direction::Right => bounds.right >= 0,
        Direction::Up => bounds.top <= 0,
        Direction::Down => bounds.bottom >= 0,
    }
}
