//! Saved reader state
//!
//! The reader only produces and consumes a JSON string; where it is stored
//! is up to the host. The envelope is versioned so an older build refuses
//! state written by a newer one instead of misreading it.

use crate::mode::InteractionMode;
use crate::pager::PagerState;
use pdf_reader_core::DrawingSnapshot;
use serde::{Deserialize, Serialize};

/// Envelope version written by this build
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid saved state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported saved state version {0}")]
    UnsupportedVersion(u32),

    #[error("saved page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Mode plus pager position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReaderState {
    #[serde(default)]
    pub mode: InteractionMode,
    #[serde(flatten)]
    pub pager: PagerState,
}

impl ReaderState {
    /// Fit the state to a document of `count` pages
    ///
    /// A page past the end is pulled back to the last page. An empty
    /// document cannot hold any saved position.
    pub fn clamped(mut self, count: usize) -> PersistResult<Self> {
        if count == 0 {
            return Err(PersistError::PageOutOfRange {
                page: self.pager.current,
                count,
            });
        }
        if self.pager.current >= count {
            log::warn!(
                "saved page {} is past the end of a {}-page document; restoring page {}",
                self.pager.current,
                count,
                count - 1
            );
            self.pager.current = count - 1;
        }
        if !self.pager.normalized_scale.is_finite() || self.pager.normalized_scale <= 0.0 {
            log::warn!("ignoring saved scale {}", self.pager.normalized_scale);
            self.pager.normalized_scale = 0.0;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub version: u32,
    pub reader: ReaderState,
    #[serde(default)]
    pub drawing: DrawingSnapshot,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl SavedState {
    pub fn new(reader: ReaderState, drawing: DrawingSnapshot) -> Self {
        Self {
            version: STATE_VERSION,
            reader,
            drawing,
        }
    }

    pub fn to_json(&self) -> PersistResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse saved state, checking the version before the body
    pub fn from_json(json: &str) -> PersistResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let probe: VersionProbe = serde_json::from_value(value.clone())?;
        if probe.version != STATE_VERSION {
            return Err(PersistError::UnsupportedVersion(probe.version));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_reader_core::{PageCoordinate, Stroke};

    fn state() -> SavedState {
        let reader = ReaderState {
            mode: InteractionMode::Drawing,
            pager: PagerState {
                current: 4,
                scroll_x: -12,
                scroll_y: 30,
                reflow: true,
                normalized_scale: 1.5,
                ..PagerState::default()
            },
        };
        let stroke = Stroke::new(vec![PageCoordinate::new(1.0, 2.0), PageCoordinate::new(3.0, 4.0)]);
        let drawing = DrawingSnapshot {
            strokes: vec![stroke.clone()],
            history: vec![Vec::new(), vec![stroke]],
        };
        SavedState::new(reader, drawing)
    }

    #[test]
    fn test_json_round_trip() {
        let saved = state();
        let json = saved.to_json().unwrap();
        assert!(json.contains("\"version\":1"));
        // pager fields sit next to the mode
        assert!(json.contains("\"scroll_x\":-12"));

        let back = SavedState::from_json(&json).unwrap();
        assert_eq!(back, saved);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let json = r#"{"version":7,"reader":{"something":"else"}}"#;
        assert!(matches!(
            SavedState::from_json(json),
            Err(PersistError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_garbage_is_a_json_error() {
        assert!(matches!(SavedState::from_json("not json"), Err(PersistError::Json(_))));
    }

    #[test]
    fn test_missing_drawing_defaults_to_empty() {
        let json = r#"{"version":1,"reader":{"mode":"Viewing","current":2,"scroll_x":0,"scroll_y":0,
            "scroller_last_x":0,"scroller_last_y":0,"prev_focus_x":0,"prev_focus_y":0,
            "reflow":false,"scroll_disabled":false,"normalized_scale":1.0}}"#;
        let saved = SavedState::from_json(json).unwrap();
        assert_eq!(saved.reader.pager.current, 2);
        assert!(saved.drawing.strokes.is_empty());
    }

    #[test]
    fn test_clamp_to_document() {
        let reader = state().reader;
        assert_eq!(reader.clamped(3).unwrap().pager.current, 2);
        assert_eq!(reader.clamped(10).unwrap().pager.current, 4);
        assert!(matches!(
            reader.clamped(0),
            Err(PersistError::PageOutOfRange { page: 4, count: 0 })
        ));

        let mut bad_scale = reader;
        bad_scale.pager.normalized_scale = f32::NAN;
        assert_eq!(bad_scale.clamped(10).unwrap().pager.normalized_scale, 0.0);
    }
}
