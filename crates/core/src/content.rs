//! Page content loaded in the background
//!
//! Each page's annotations, sidecar notes, links, widget areas and text lines
//! arrive asynchronously through generation-stamped [`ResultSlot`]s. The UI
//! tick drains them into a [`PageContent`] it owns, so hit tests and text
//! selection only ever read UI-side state.

use crate::annotation::{Annotation, SidecarNote};
use crate::geometry::DocRect;
use crate::hit_test::Link;
use crate::text::TextLine;
use pdf_reader_scheduler::ResultSlot;

/// Slots a worker publishes one page's content into
#[derive(Debug, Clone)]
pub struct PageContentSlots {
    pub annotations: ResultSlot<Vec<Annotation>>,
    pub sidecar_notes: ResultSlot<Vec<SidecarNote>>,
    pub links: ResultSlot<Vec<Link>>,
    pub widget_areas: ResultSlot<Vec<DocRect>>,
    pub text_lines: ResultSlot<Vec<TextLine>>,
}

impl PageContentSlots {
    pub fn new(generation: u64) -> Self {
        Self {
            annotations: ResultSlot::new(generation),
            sidecar_notes: ResultSlot::new(generation),
            links: ResultSlot::new(generation),
            widget_areas: ResultSlot::new(generation),
            text_lines: ResultSlot::new(generation),
        }
    }

    /// Move every slot to `generation`, dropping unread results
    pub fn reset(&self, generation: u64) {
        self.annotations.reset(generation);
        self.sidecar_notes.reset(generation);
        self.links.reset(generation);
        self.widget_areas.reset(generation);
        self.text_lines.reset(generation);
    }
}

/// What changed in a [`PageContent::drain`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentChanges {
    /// Embedded annotations or sidecar notes were reloaded
    pub annotations: bool,
    pub links: bool,
    pub widgets: bool,
    pub text: bool,
}

impl ContentChanges {
    pub fn any(&self) -> bool {
        self.annotations || self.links || self.widgets || self.text
    }
}

/// Loaded content of the current page
///
/// `None` means not loaded yet, which is different from loaded-and-empty.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page: usize,
    generation: u64,
    slots: PageContentSlots,
    pub annotations: Option<Vec<Annotation>>,
    pub sidecar_notes: Option<Vec<SidecarNote>>,
    pub links: Option<Vec<Link>>,
    pub widget_areas: Option<Vec<DocRect>>,
    pub text_lines: Option<Vec<TextLine>>,
}

impl PageContent {
    pub fn new(page: usize, generation: u64) -> Self {
        Self {
            page,
            generation,
            slots: PageContentSlots::new(generation),
            annotations: None,
            sidecar_notes: None,
            links: None,
            widget_areas: None,
            text_lines: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Slots to hand to the engine for loading
    pub fn slots(&self) -> PageContentSlots {
        self.slots.clone()
    }

    /// Switch to `page` under a new `generation`, forgetting loaded content
    pub fn retarget(&mut self, page: usize, generation: u64) {
        self.page = page;
        self.generation = generation;
        self.slots.reset(generation);
        self.annotations = None;
        self.sidecar_notes = None;
        self.links = None;
        self.widget_areas = None;
        self.text_lines = None;
    }

    /// Reload the same page under a new `generation`
    ///
    /// Loaded values stay readable until the new results are drained.
    pub fn refresh(&mut self, generation: u64) {
        self.generation = generation;
        self.slots.reset(generation);
    }

    /// Move freshly published results into this page's state
    pub fn drain(&mut self) -> ContentChanges {
        let generation = self.generation;
        let mut changes = ContentChanges::default();

        if let Some(annotations) = self.slots.annotations.take(generation) {
            self.annotations = Some(annotations);
            changes.annotations = true;
        }
        if let Some(notes) = self.slots.sidecar_notes.take(generation) {
            self.sidecar_notes = Some(notes);
            changes.annotations = true;
        }
        if let Some(links) = self.slots.links.take(generation) {
            self.links = Some(links);
            changes.links = true;
        }
        if let Some(areas) = self.slots.widget_areas.take(generation) {
            self.widget_areas = Some(areas);
            changes.widgets = true;
        }
        if let Some(lines) = self.slots.text_lines.take(generation) {
            self.text_lines = Some(lines);
            changes.text = true;
        }
        changes
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.annotations.as_deref().unwrap_or(&[])
    }

    pub fn sidecar_notes(&self) -> &[SidecarNote] {
        self.sidecar_notes.as_deref().unwrap_or(&[])
    }

    pub fn links(&self) -> &[Link] {
        self.links.as_deref().unwrap_or(&[])
    }

    pub fn widget_areas(&self) -> &[DocRect] {
        self.widget_areas.as_deref().unwrap_or(&[])
    }

    pub fn text_lines(&self) -> &[TextLine] {
        self.text_lines.as_deref().unwrap_or(&[])
    }

    pub fn has_text(&self) -> bool {
        self.text_lines.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;
    use std::thread;

    #[test]
    fn test_drain_applies_current_generation() {
        let mut content = PageContent::new(0, 1);
        let slots = content.slots();

        let worker = thread::spawn(move || {
            slots.annotations.publish(
                1,
                vec![Annotation::new(AnnotationKind::Ink, DocRect::new(0.0, 0.0, 5.0, 5.0))],
            );
            slots.text_lines.publish(1, Vec::new());
        });
        worker.join().unwrap();

        let changes = content.drain();
        assert!(changes.annotations && changes.text);
        assert!(!changes.links);
        assert_eq!(content.annotations().len(), 1);
        assert!(content.has_text());

        // drained values are not reported twice
        assert!(!content.drain().any());
    }

    #[test]
    fn test_stale_load_after_retarget_is_dropped() {
        let mut content = PageContent::new(0, 1);
        let stale = content.slots();

        content.retarget(1, 2);
        stale.links.publish(1, Vec::new());

        assert!(!content.drain().links);
        assert!(content.links.is_none());
        assert_eq!(content.page, 1);
    }

    #[test]
    fn test_refresh_keeps_loaded_values_until_replaced() {
        let mut content = PageContent::new(0, 1);
        content.slots().widget_areas.publish(1, vec![DocRect::new(0.0, 0.0, 1.0, 1.0)]);
        content.drain();

        content.refresh(2);
        assert_eq!(content.widget_areas().len(), 1);

        content.slots().widget_areas.publish(2, Vec::new());
        assert!(content.drain().widgets);
        assert!(content.widget_areas().is_empty());
    }
}
