//! Selection-marker drag
//!
//! In selecting mode the two ends of a text selection carry markers. A drag
//! that starts on one of them moves that end for the rest of the gesture,
//! even if the pointer later passes over the other marker.

use pdf_reader_core::{GestureConfig, PageCoordinate, TextLine, TextSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct MarkerDrag {
    radius_px: f32,
    active: Option<Marker>,
}

impl MarkerDrag {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            radius_px: config.marker_radius_px(),
            active: None,
        }
    }

    pub fn active(&self) -> Option<Marker> {
        self.active
    }

    /// Marker under `point`, left first
    pub fn marker_at(
        &self,
        selection: &TextSelection,
        lines: &[TextLine],
        point: &PageCoordinate,
        scale: f32,
    ) -> Option<Marker> {
        if scale <= 0.0 {
            return None;
        }
        let radius = self.radius_px / scale;
        if selection.hits_left_marker(lines, point, radius) {
            Some(Marker::Left)
        } else if selection.hits_right_marker(lines, point, radius) {
            Some(Marker::Right)
        } else {
            None
        }
    }

    /// Pointer down; latches a marker if one is under `point`
    pub fn begin(
        &mut self,
        selection: Option<&TextSelection>,
        lines: &[TextLine],
        point: &PageCoordinate,
        scale: f32,
    ) -> bool {
        self.active = selection.and_then(|s| self.marker_at(s, lines, point, scale));
        self.active.is_some()
    }

    /// Move the latched marker to `point`; false when nothing is latched
    /// or no word is near enough
    pub fn drag(&self, selection: &mut TextSelection, lines: &[TextLine], point: &PageCoordinate) -> bool {
        match self.active {
            Some(Marker::Left) => selection.move_left_marker(lines, point),
            Some(Marker::Right) => selection.move_right_marker(lines, point),
            None => false,
        }
    }

    pub fn end(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_reader_core::{DocRect, TextWord};

    fn lines() -> Vec<TextLine> {
        vec![
            TextLine::new(vec![
                TextWord::new(DocRect::new(0.0, 0.0, 40.0, 10.0), "alpha"),
                TextWord::new(DocRect::new(50.0, 0.0, 90.0, 10.0), "beta"),
                TextWord::new(DocRect::new(100.0, 0.0, 140.0, 10.0), "gamma"),
            ]),
            TextLine::new(vec![TextWord::new(DocRect::new(0.0, 20.0, 40.0, 30.0), "delta")]),
        ]
    }

    #[test]
    fn test_drag_right_marker_extends_selection() {
        let lines = lines();
        let mut selection = TextSelection::select(&lines, &DocRect::new(55.0, 2.0, 60.0, 8.0)).unwrap();
        let mut drag = MarkerDrag::new(&GestureConfig::default());

        assert!(drag.begin(Some(&selection), &lines, &PageCoordinate::new(91.0, 11.0), 1.0));
        assert_eq!(drag.active(), Some(Marker::Right));

        assert!(drag.drag(&mut selection, &lines, &PageCoordinate::new(20.0, 25.0)));
        assert_eq!(selection.text(&lines), "beta gamma\ndelta");
    }

    #[test]
    fn test_latched_marker_stays_for_the_gesture() {
        let lines = lines();
        let mut selection = TextSelection::select(&lines, &DocRect::new(55.0, 2.0, 60.0, 8.0)).unwrap();
        let mut drag = MarkerDrag::new(&GestureConfig::default());

        // both markers of a one-word selection are close; the left one wins
        assert!(drag.begin(Some(&selection), &lines, &PageCoordinate::new(50.0, 10.0), 1.0));
        assert_eq!(drag.active(), Some(Marker::Left));
        drag.drag(&mut selection, &lines, &PageCoordinate::new(5.0, 5.0));
        assert_eq!(selection.text(&lines), "alpha beta");

        drag.end();
        assert!(!drag.drag(&mut selection, &lines, &PageCoordinate::new(120.0, 5.0)));
    }

    #[test]
    fn test_radius_shrinks_with_zoom() {
        let lines = lines();
        let selection = TextSelection::select(&lines, &DocRect::new(55.0, 2.0, 60.0, 8.0)).unwrap();
        let drag = MarkerDrag::new(&GestureConfig::default());
        let point = PageCoordinate::new(90.0, 25.0);

        assert_eq!(drag.marker_at(&selection, &lines, &point, 1.0), Some(Marker::Right));
        assert_eq!(drag.marker_at(&selection, &lines, &point, 4.0), None);
        assert_eq!(drag.marker_at(&selection, &lines, &point, 0.0), None);
    }
}
