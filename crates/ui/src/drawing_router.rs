//! Pointer stream to ink actions
//!
//! Turns down/move/up/cancel sequences into begin/append/end actions for
//! the drawing session. A stroke only begins once the pointer has moved
//! `slop` pixels from the down point, and then begins *at* the down point so
//! nothing is lost. A press that never moves that far is a tap and is
//! synthesized into a complete (dot) stroke or a single eraser dab.

use crate::event::PointerAction;
use pdf_reader_core::ScreenPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeMode {
    #[default]
    Draw,
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InkAction {
    BeginStroke(ScreenPoint),
    AppendPoint(ScreenPoint),
    EndStroke(ScreenPoint),
    BeginErase(ScreenPoint),
    AppendErase(ScreenPoint),
    EndErase(ScreenPoint),
    /// Drop the stroke in progress
    Cancel,
}

#[derive(Debug, Clone)]
pub struct DrawingGestureRouter {
    slop: f32,
    mode: StrokeMode,
    down: Option<ScreenPoint>,
    in_progress: bool,
    exceeded_slop: bool,
    /// Ignore the rest of the gesture
    abandoned: bool,
}

impl DrawingGestureRouter {
    pub fn new(slop: f32) -> Self {
        Self {
            slop: slop.max(0.0),
            mode: StrokeMode::Draw,
            down: None,
            in_progress: false,
            exceeded_slop: false,
            abandoned: false,
        }
    }

    pub fn mode(&self) -> StrokeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: StrokeMode) {
        self.mode = mode;
    }

    /// A stroke or erase has begun and not yet ended
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// A press is down but has not moved past the slop yet
    pub fn is_pending_tap(&self) -> bool {
        self.down.is_some() && !self.in_progress && !self.abandoned
    }

    /// Swallow everything until the next down
    pub fn abandon(&mut self) {
        self.abandoned = true;
        self.in_progress = false;
        self.exceeded_slop = false;
    }

    pub fn process(&mut self, action: PointerAction, point: ScreenPoint) -> Vec<InkAction> {
        let mut out = Vec::new();
        match action {
            PointerAction::Down => {
                self.down = Some(point);
                self.in_progress = false;
                self.exceeded_slop = false;
                self.abandoned = false;
            }
            PointerAction::Move => {
                if self.abandoned {
                    return out;
                }
                let Some(down) = self.down else {
                    return out;
                };
                if !self.exceeded_slop && down.distance_to(&point) >= self.slop {
                    self.exceeded_slop = true;
                    if !self.in_progress {
                        out.push(self.begin(down));
                        self.in_progress = true;
                    }
                }
                if self.in_progress {
                    out.push(match self.mode {
                        StrokeMode::Draw => InkAction::AppendPoint(point),
                        StrokeMode::Erase => InkAction::AppendErase(point),
                    });
                }
            }
            PointerAction::Up => {
                let down = self.down.take();
                if self.abandoned {
                    self.abandoned = false;
                    return out;
                }
                if self.in_progress {
                    out.push(self.end(point));
                    self.in_progress = false;
                } else if let Some(down) = down {
                    out.push(self.begin(down));
                    if self.mode == StrokeMode::Draw && down != point {
                        out.push(InkAction::AppendPoint(point));
                    }
                    out.push(self.end(point));
                }
                self.exceeded_slop = false;
            }
            PointerAction::Cancel => {
                if self.in_progress {
                    out.push(InkAction::Cancel);
                }
                self.down = None;
                self.in_progress = false;
                self.exceeded_slop = false;
                self.abandoned = false;
            }
            PointerAction::SecondaryDown | PointerAction::SecondaryUp => {}
        }
        out
    }

    fn begin(&self, point: ScreenPoint) -> InkAction {
        match self.mode {
            StrokeMode::Draw => InkAction::BeginStroke(point),
            StrokeMode::Erase => InkAction::BeginErase(point),
        }
    }

    fn end(&self, point: ScreenPoint) -> InkAction {
        match self.mode {
            StrokeMode::Draw => InkAction::EndStroke(point),
            StrokeMode::Erase => InkAction::EndErase(point),
        }
    }
}
