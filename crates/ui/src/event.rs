//! Input and output vocabulary of the gesture router

use crate::mode::InteractionMode;
use pdf_reader_core::{AnnotationRef, DocRect, LinkTarget, ScreenPoint, Selection, WidgetAction};

/// Kind of device behind a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Finger,
    Stylus,
    Mouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// First pointer of a gesture went down
    Down,
    Move,
    /// Last pointer went up
    Up,
    Cancel,
    /// An additional pointer went down
    SecondaryDown,
    /// An additional pointer went up while others remain
    SecondaryUp,
}

/// One raw pointer event in view coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub position: ScreenPoint,
    pub tool: ToolKind,
    pub time_ms: u64,
    pub pointer_count: usize,
    /// Samples batched since the previous move, oldest first
    pub history: Vec<ScreenPoint>,
    /// Release velocity in px/s, reported with `Up`
    pub velocity: Option<(f32, f32)>,
}

impl PointerEvent {
    pub fn new(action: PointerAction, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            action,
            position: ScreenPoint::new(x, y),
            tool: ToolKind::Finger,
            time_ms,
            pointer_count: 1,
            history: Vec::new(),
            velocity: None,
        }
    }

    pub fn down(x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(PointerAction::Down, x, y, time_ms)
    }

    pub fn moved(x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(PointerAction::Move, x, y, time_ms)
    }

    pub fn up(x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(PointerAction::Up, x, y, time_ms)
    }

    pub fn cancel(x: f32, y: f32, time_ms: u64) -> Self {
        Self::new(PointerAction::Cancel, x, y, time_ms)
    }

    pub fn with_tool(mut self, tool: ToolKind) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_history(mut self, history: Vec<ScreenPoint>) -> Self {
        self.history = history;
        self
    }

    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.velocity = Some((vx, vy));
        self
    }

    pub fn with_pointer_count(mut self, count: usize) -> Self {
        self.pointer_count = count;
        self
    }

    pub fn is_stylus(&self) -> bool {
        self.tool == ToolKind::Stylus
    }
}

/// User-visible feedback that is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The selected annotation cannot be moved or resized
    PositionLocked,
}

/// Notifications for the host, drained after each router call
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    ModeChanged {
        from: InteractionMode,
        to: InteractionMode,
    },
    LinkActivated(LinkTarget),
    TapMainArea,
    TapNextMargin,
    TapPreviousMargin,
    AnnotationSelected(Selection),
    SelectionCleared,
    /// Open the editor for the selected annotation
    EditAnnotation(Selection),
    WidgetActivated {
        page: usize,
        action: WidgetAction,
    },
    StrokeCountChanged(usize),
    Notice(Notice),
    /// A moved annotation has group members that could follow it
    GroupMoveOffered {
        page: usize,
        target: AnnotationRef,
        dx: f32,
        dy: f32,
        members: Vec<AnnotationRef>,
    },
    TextSelected {
        page: usize,
        text: String,
        rects: Vec<DocRect>,
    },
    PageChanged(usize),
    /// The document was panned by the user
    DocMotion,
}

/// Delayed work owned by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderTimer {
    LongPress,
    SelectionRetry,
    StylusDecay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event_builders() {
        let event = PointerEvent::up(10.0, 20.0, 500)
            .with_tool(ToolKind::Stylus)
            .with_velocity(-300.0, 0.0);
        assert_eq!(event.action, PointerAction::Up);
        assert!(event.is_stylus());
        assert_eq!(event.velocity, Some((-300.0, 0.0)));
        assert_eq!(event.pointer_count, 1);
        assert!(event.history.is_empty());
    }
}
