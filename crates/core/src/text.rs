//! Page text lines and word-granular text selection
//!
//! Text comes from the document engine as lines of positioned words in
//! document space. A selection spans a contiguous reading-order range of
//! words, addressed by `(line, word)` positions, and exposes two markers the
//! user can drag to extend it.

use crate::geometry::{DocRect, PageCoordinate};
use serde::{Deserialize, Serialize};

/// A single word with its bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWord {
    pub rect: DocRect,
    pub text: String,
}

impl TextWord {
    pub fn new(rect: DocRect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
        }
    }
}

/// One line of words in reading order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLine {
    pub words: Vec<TextWord>,
}

impl TextLine {
    pub fn new(words: Vec<TextWord>) -> Self {
        Self { words }
    }
}

/// Position of a word: `(line index, word index)`
pub type WordPos = (usize, usize);

/// Contiguous word range selected on one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    start: WordPos,
    end: WordPos,
}

impl TextSelection {
    /// Select every word intersecting `probe`
    ///
    /// Returns `None` when nothing intersects, which includes the case where
    /// the page's text has not been loaded yet (`lines` empty).
    pub fn select(lines: &[TextLine], probe: &DocRect) -> Option<Self> {
        let mut hits = words(lines).filter(|(_, word)| word.rect.intersects(probe));
        let (first, _) = hits.next()?;
        let last = hits.last().map(|(pos, _)| pos).unwrap_or(first);
        Some(Self {
            start: first,
            end: last,
        })
    }

    pub fn start(&self) -> WordPos {
        self.start
    }

    pub fn end(&self) -> WordPos {
        self.end
    }

    /// Anchor point of the left marker (bottom-left of the first word)
    pub fn left_marker(&self, lines: &[TextLine]) -> Option<PageCoordinate> {
        word_at(lines, self.start).map(|w| PageCoordinate::new(w.rect.left, w.rect.bottom))
    }

    /// Anchor point of the right marker (bottom-right of the last word)
    pub fn right_marker(&self, lines: &[TextLine]) -> Option<PageCoordinate> {
        word_at(lines, self.end).map(|w| PageCoordinate::new(w.rect.right, w.rect.bottom))
    }

    /// Whether `point` is within `radius` of the left marker
    pub fn hits_left_marker(&self, lines: &[TextLine], point: &PageCoordinate, radius: f32) -> bool {
        self.left_marker(lines)
            .is_some_and(|marker| marker.distance_to(point) <= radius)
    }

    /// Whether `point` is within `radius` of the right marker
    pub fn hits_right_marker(&self, lines: &[TextLine], point: &PageCoordinate, radius: f32) -> bool {
        self.right_marker(lines)
            .is_some_and(|marker| marker.distance_to(point) <= radius)
    }

    /// Move the start of the selection to the word nearest `point`
    ///
    /// If the new start passes the end the two are swapped, so the range
    /// stays ordered.
    pub fn move_left_marker(&mut self, lines: &[TextLine], point: &PageCoordinate) -> bool {
        let Some(pos) = nearest_word(lines, point) else {
            return false;
        };
        self.start = pos;
        if self.start > self.end {
            std::mem::swap(&mut self.start, &mut self.end);
        }
        true
    }

    /// Move the end of the selection to the word nearest `point`
    pub fn move_right_marker(&mut self, lines: &[TextLine], point: &PageCoordinate) -> bool {
        let Some(pos) = nearest_word(lines, point) else {
            return false;
        };
        self.end = pos;
        if self.end < self.start {
            std::mem::swap(&mut self.start, &mut self.end);
        }
        true
    }

    fn selected<'a>(&self, lines: &'a [TextLine]) -> impl Iterator<Item = (WordPos, &'a TextWord)> {
        let (start, end) = (self.start, self.end);
        words(lines).filter(move |(pos, _)| *pos >= start && *pos <= end)
    }

    /// Selected text; words joined by spaces and lines by newlines
    pub fn text(&self, lines: &[TextLine]) -> String {
        let mut out = String::new();
        let mut current_line = None;
        for ((line, _), word) in self.selected(lines) {
            match current_line {
                Some(previous) if previous != line => out.push('\n'),
                Some(_) => out.push(' '),
                None => {}
            }
            current_line = Some(line);
            out.push_str(&word.text);
        }
        out
    }

    /// Bounds of every selected word, for highlighting
    pub fn rects(&self, lines: &[TextLine]) -> Vec<DocRect> {
        self.selected(lines).map(|(_, word)| word.rect).collect()
    }
}

fn words(lines: &[TextLine]) -> impl Iterator<Item = (WordPos, &TextWord)> {
    lines.iter().enumerate().flat_map(|(line_index, line)| {
        line.words
            .iter()
            .enumerate()
            .map(move |(word_index, word)| ((line_index, word_index), word))
    })
}

fn word_at(lines: &[TextLine], (line, word): WordPos) -> Option<&TextWord> {
    lines.get(line).and_then(|l| l.words.get(word))
}

fn nearest_word(lines: &[TextLine], point: &PageCoordinate) -> Option<WordPos> {
    words(lines)
        .map(|(pos, word)| (pos, word.rect.distance_sq_to(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(pos, _)| pos)
}
