//! Freehand ink drawing session
//!
//! Holds the strokes drawn on the current page before they are committed to
//! the document engine, together with an undo history of whole stroke-list
//! snapshots and the eraser that splits strokes apart.
//!
//! All coordinates are document space; the caller converts pointer positions
//! before calling in.

use crate::geometry::PageCoordinate;
use serde::{Deserialize, Serialize};

/// An ordered sequence of document-space points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<PageCoordinate>,
}

impl Stroke {
    pub fn new(points: Vec<PageCoordinate>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Serializable drawing state (current strokes plus undo history)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawingSnapshot {
    pub strokes: Vec<Stroke>,
    /// Oldest first; the last entry is undone first
    pub history: Vec<Vec<Stroke>>,
}

/// In-progress ink on one page
#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    strokes: Vec<Stroke>,
    history: Vec<Vec<Stroke>>,
    eraser: Option<PageCoordinate>,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current strokes, then open a new stroke at `point`
    pub fn start_draw(&mut self, point: PageCoordinate) {
        self.save_to_history();
        self.strokes.push(Stroke::new(vec![point]));
    }

    /// Append `point` to the open stroke
    pub fn continue_draw(&mut self, point: PageCoordinate) {
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(point);
        }
    }

    /// Close the open stroke
    ///
    /// A stroke that is still a single point gets a small diamond of side
    /// `thickness / 2` appended so the dot stays visible.
    pub fn finish_draw(&mut self, thickness: f32) {
        let Some(stroke) = self.strokes.last_mut() else {
            return;
        };
        if stroke.points.len() == 1 {
            let origin = stroke.points[0];
            let half = 0.5 * thickness;
            stroke.points.extend([
                origin.offset(half, 0.0),
                origin.offset(half, half),
                origin.offset(0.0, half),
                origin,
                origin.offset(half, 0.0),
            ]);
        }
    }

    /// Snapshot the current strokes, then erase at `center`
    pub fn start_erase(&mut self, center: PageCoordinate, radius: f32) {
        self.save_to_history();
        self.eraser = Some(center);
        self.continue_erase(center, radius);
    }

    /// Move the eraser to `center` and split every stroke it touches
    ///
    /// Segments are clipped where they cross the eraser circle, so the kept
    /// pieces end exactly at its edge. Points inside the circle are removed.
    /// Sub-strokes left with fewer than two points are dropped.
    pub fn continue_erase(&mut self, center: PageCoordinate, radius: f32) {
        if self.eraser.is_none() || self.strokes.is_empty() {
            return;
        }
        self.eraser = Some(center);

        let mut remaining = Vec::with_capacity(self.strokes.len());
        for stroke in self.strokes.drain(..) {
            let mut points = stroke.points.into_iter();
            let Some(mut previous) = points.next() else {
                continue;
            };
            let mut current: Vec<PageCoordinate> = Vec::new();
            if previous.distance_to(&center) > radius {
                current.push(previous);
            }
            for point in points {
                match crossing(&previous, &point, &center, radius) {
                    Crossing::Outside => {
                        if current.is_empty() {
                            current.push(previous);
                        }
                        current.push(point);
                    }
                    Crossing::Through { entry, exit } => {
                        if let Some(entry) = entry {
                            if current.is_empty() {
                                current.push(previous);
                            }
                            current.push(entry);
                        }
                        flush(&mut remaining, &mut current);
                        if let Some(exit) = exit {
                            current.push(exit);
                            current.push(point);
                        }
                    }
                }
                previous = point;
            }
            flush(&mut remaining, &mut current);
        }
        remaining.retain(|stroke: &Stroke| stroke.len() >= 2);
        self.strokes = remaining;
    }

    /// Final erase step at `center`; the eraser is then released
    pub fn finish_erase(&mut self, center: PageCoordinate, radius: f32) {
        self.continue_erase(center, radius);
        self.eraser = None;
    }

    /// Replace the strokes with the most recent history snapshot
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.strokes = previous;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Discard all strokes and history
    pub fn cancel(&mut self) {
        self.strokes.clear();
        self.history.clear();
        self.eraser = None;
    }

    /// Hand the strokes over for commit and reset the session
    pub fn take_strokes(&mut self) -> Vec<Stroke> {
        let strokes = std::mem::take(&mut self.strokes);
        self.cancel();
        strokes
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Current eraser centre while an erase is in progress
    pub fn eraser(&self) -> Option<PageCoordinate> {
        self.eraser
    }

    pub fn snapshot(&self) -> DrawingSnapshot {
        DrawingSnapshot {
            strokes: self.strokes.clone(),
            history: self.history.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DrawingSnapshot) {
        self.strokes = snapshot.strokes;
        self.history = snapshot.history;
        self.eraser = None;
    }

    fn save_to_history(&mut self) {
        self.history.push(self.strokes.clone());
    }
}

/// How a segment meets the eraser circle
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    Outside,
    /// `entry` is set when the segment starts outside the circle, `exit`
    /// when it ends outside
    Through {
        entry: Option<PageCoordinate>,
        exit: Option<PageCoordinate>,
    },
}

fn crossing(a: &PageCoordinate, b: &PageCoordinate, center: &PageCoordinate, radius: f32) -> Crossing {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (fx, fy) = (a.x - center.x, a.y - center.y);
    let qa = dx * dx + dy * dy;
    let qc = fx * fx + fy * fy - radius * radius;
    if qa <= f32::EPSILON {
        return if qc <= 0.0 {
            Crossing::Through {
                entry: None,
                exit: None,
            }
        } else {
            Crossing::Outside
        };
    }
    let qb = 2.0 * (fx * dx + fy * dy);
    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return Crossing::Outside;
    }
    let root = discriminant.sqrt();
    let t0 = (-qb - root) / (2.0 * qa);
    let t1 = (-qb + root) / (2.0 * qa);
    if t1 < 0.0 || t0 > 1.0 {
        return Crossing::Outside;
    }
    let at = |t: f32| PageCoordinate::new(a.x + dx * t, a.y + dy * t);
    Crossing::Through {
        entry: (t0 > 0.0).then(|| at(t0)),
        exit: (t1 < 1.0).then(|| at(t1)),
    }
}

fn flush(out: &mut Vec<Stroke>, current: &mut Vec<PageCoordinate>) {
    if !current.is_empty() {
        out.push(Stroke::new(std::mem::take(current)));
    }
}
