//! Tap hit-testing against links, annotations and form widgets
//!
//! Resolution order is fixed: links first, then annotations (embedded, then
//! sidecar notes), then widget areas when the document supports scripting.
//! Overlapping annotations are tried starting from a rotating index so that
//! repeated taps on the same spot cycle through the stack.

use crate::annotation::{Annotation, AnnotationKind, Selection, SelectionKind, SidecarNote};
use crate::config::GestureConfig;
use crate::geometry::{DocRect, PageCoordinate};
use serde::{Deserialize, Serialize};

/// What a tap landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hit {
    LinkInternal,
    LinkExternal,
    LinkRemote,
    /// Text markup (highlight, underline, squiggly, strike-out)
    Annotation,
    InkAnnotation,
    TextAnnotation,
    Widget,
    Nothing,
}

impl Hit {
    pub fn is_link(&self) -> bool {
        matches!(self, Hit::LinkInternal | Hit::LinkExternal | Hit::LinkRemote)
    }

    /// Hit category for an annotation kind; `None` if the kind is not hittable
    pub fn for_kind(kind: AnnotationKind) -> Option<Hit> {
        match kind {
            AnnotationKind::Highlight
            | AnnotationKind::Underline
            | AnnotationKind::Squiggly
            | AnnotationKind::StrikeOut => Some(Hit::Annotation),
            AnnotationKind::Ink => Some(Hit::InkAnnotation),
            AnnotationKind::Text | AnnotationKind::FreeText => Some(Hit::TextAnnotation),
            _ => None,
        }
    }
}

/// Destination of a hyperlink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkTarget {
    Internal { page: usize },
    External { uri: String },
    Remote { file: String, page: usize },
}

/// A hyperlink region on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rect: DocRect,
    pub target: LinkTarget,
}

impl Link {
    pub fn new(rect: DocRect, target: LinkTarget) -> Self {
        Self { rect, target }
    }

    fn hit(&self) -> Hit {
        match self.target {
            LinkTarget::Internal { .. } => Hit::LinkInternal,
            LinkTarget::External { .. } => Hit::LinkExternal,
            LinkTarget::Remote { .. } => Hit::LinkRemote,
        }
    }
}

/// Page content a hit test runs against
#[derive(Debug, Clone, Copy)]
pub struct HitContext<'a> {
    pub links: &'a [Link],
    pub annotations: &'a [Annotation],
    pub sidecar_notes: &'a [SidecarNote],
    pub widget_areas: &'a [DocRect],
    pub javascript_supported: bool,
    /// Current page scale, used to turn pixel slops into document units
    pub page_scale: f32,
    pub selected: Option<&'a Selection>,
    /// Whether the tap landed on a manipulation handle of the selection
    pub on_handle: bool,
}

impl<'a> HitContext<'a> {
    /// Context with no content and no selection at the given scale
    pub fn empty(page_scale: f32) -> Self {
        Self {
            links: &[],
            annotations: &[],
            sidecar_notes: &[],
            widget_areas: &[],
            javascript_supported: false,
            page_scale,
            selected: None,
            on_handle: false,
        }
    }

    fn link_at(&self, point: &PageCoordinate) -> Option<&'a Link> {
        self.links.iter().find(|link| link.rect.contains_point(point))
    }

    fn widget_at(&self, point: &PageCoordinate) -> bool {
        self.javascript_supported && self.widget_areas.iter().any(|area| area.contains_point(point))
    }
}

/// Timing of the tap being resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub point: PageCoordinate,
    pub time_ms: u64,
    /// Time between pointer down and up
    pub duration_ms: u64,
}

/// Selection side effect of a click
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionUpdate {
    Unchanged,
    Selected(Selection),
    Cleared,
}

/// Result of [`HitTestResolver::pass_click`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    pub hit: Hit,
    pub link: Option<LinkTarget>,
    pub selection: SelectionUpdate,
    /// The tap asks to edit the selected text annotation
    pub edit_requested: bool,
}

impl ClickOutcome {
    fn new(hit: Hit, selection: SelectionUpdate) -> Self {
        Self {
            hit,
            link: None,
            selection,
            edit_requested: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TappedText {
    Embedded(usize),
    Sidecar(String),
}

/// Stateful hit-test resolver for one page
#[derive(Debug, Clone)]
pub struct HitTestResolver {
    text_hit_slop_px: f32,
    near_miss_slop_px: f32,
    double_tap_timeout_ms: u64,
    long_press_timeout_ms: u64,
    last_hit: usize,
    last_tapped_text: Option<TappedText>,
    last_tap: Option<(PageCoordinate, u64)>,
}

impl HitTestResolver {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            text_hit_slop_px: config.text_hit_slop_px(),
            near_miss_slop_px: config.near_miss_slop_px(),
            double_tap_timeout_ms: config.double_tap_timeout_ms,
            long_press_timeout_ms: config.long_press_timeout_ms,
            last_hit: 0,
            last_tapped_text: None,
            last_tap: None,
        }
    }

    /// Forget rotation and tap history (page changed)
    pub fn reset(&mut self) {
        self.last_hit = 0;
        self.last_tapped_text = None;
        self.last_tap = None;
    }

    /// Index the next rotation starts from
    pub fn last_hit(&self) -> usize {
        self.last_hit
    }

    /// Resolve a tap and apply its selection side effects
    ///
    /// Rotates past the previously hit annotation so overlapping annotations
    /// are cycled through.
    pub fn pass_click(&mut self, ctx: &HitContext<'_>, tap: &Tap) -> ClickOutcome {
        let outcome = self.resolve_click(ctx, tap);
        self.last_tap = Some((tap.point, tap.time_ms));
        outcome
    }

    /// What a tap at `point` would hit, without any side effects
    pub fn would_hit(&self, ctx: &HitContext<'_>, point: &PageCoordinate) -> Hit {
        if let Some(link) = ctx.link_at(point) {
            return link.hit();
        }
        if let Some((index, _)) = self.find_annotation(ctx, point, 0) {
            return Hit::for_kind(ctx.annotations[index].kind).unwrap_or(Hit::Nothing);
        }
        if self.find_sidecar(ctx, point).is_some() {
            return Hit::TextAnnotation;
        }
        if ctx.widget_at(point) {
            return Hit::Widget;
        }
        Hit::Nothing
    }

    fn resolve_click(&mut self, ctx: &HitContext<'_>, tap: &Tap) -> ClickOutcome {
        let point = &tap.point;

        if let Some(link) = ctx.link_at(point) {
            let mut outcome = ClickOutcome::new(link.hit(), SelectionUpdate::Unchanged);
            outcome.link = Some(link.target.clone());
            return outcome;
        }

        if let Some((index, annotation)) = self.find_annotation(ctx, point, 1) {
            self.last_hit = index;
            let hit = Hit::for_kind(annotation.kind).unwrap_or(Hit::Nothing);
            let selection = Selection::embedded(index, annotation);
            let mut outcome = ClickOutcome::new(hit, SelectionUpdate::Selected(selection));
            if annotation.kind.is_text() {
                let selected_now = ctx
                    .selected
                    .and_then(Selection::embedded_index)
                    .is_some_and(|i| i == index);
                outcome.edit_requested =
                    self.second_tap(TappedText::Embedded(index), selected_now, ctx, tap);
            } else {
                self.last_tapped_text = None;
            }
            return outcome;
        }

        if let Some(note) = self.find_sidecar(ctx, point) {
            let selected_now = ctx.selected.is_some_and(|s| {
                matches!(&s.kind, SelectionKind::Sidecar { id } if *id == note.id)
            });
            let mut outcome = ClickOutcome::new(
                Hit::TextAnnotation,
                SelectionUpdate::Selected(Selection::sidecar(note)),
            );
            outcome.edit_requested =
                self.second_tap(TappedText::Sidecar(note.id.clone()), selected_now, ctx, tap);
            return outcome;
        }

        if self.is_near_miss_double_tap(ctx, tap) {
            log::debug!("near-miss double tap on selected text annotation treated as edit");
            let mut outcome = ClickOutcome::new(Hit::TextAnnotation, SelectionUpdate::Unchanged);
            outcome.edit_requested = true;
            return outcome;
        }

        self.last_tapped_text = None;
        if ctx.widget_at(point) {
            return ClickOutcome::new(Hit::Widget, SelectionUpdate::Cleared);
        }
        ClickOutcome::new(Hit::Nothing, SelectionUpdate::Cleared)
    }

    /// Tap once to select, tap again to edit
    fn second_tap(
        &mut self,
        tapped: TappedText,
        selected_now: bool,
        ctx: &HitContext<'_>,
        tap: &Tap,
    ) -> bool {
        let repeated = self.last_tapped_text.as_ref() == Some(&tapped);
        self.last_tapped_text = Some(tapped);
        repeated && selected_now && !ctx.on_handle && tap.duration_ms < self.long_press_timeout_ms
    }

    fn is_near_miss_double_tap(&self, ctx: &HitContext<'_>, tap: &Tap) -> bool {
        let Some(selected) = ctx.selected else {
            return false;
        };
        if !selected.is_text_annotation() || ctx.page_scale <= 0.0 {
            return false;
        }
        let Some((last_point, last_time)) = self.last_tap else {
            return false;
        };
        if tap.time_ms.saturating_sub(last_time) > self.double_tap_timeout_ms {
            return false;
        }
        let slop = self.near_miss_slop_px / ctx.page_scale;
        selected.bounds.expanded(slop).contains_point(&tap.point)
            && last_point.distance_to(&tap.point) <= slop
    }

    /// First annotation containing `point`, starting after the last hit
    ///
    /// Kinds with no hit category still stop the search; the caller selects
    /// them and reports `Hit::Nothing`.
    fn find_annotation<'a>(
        &self,
        ctx: &HitContext<'a>,
        point: &PageCoordinate,
        rotate: usize,
    ) -> Option<(usize, &'a Annotation)> {
        let count = ctx.annotations.len();
        if count == 0 {
            return None;
        }
        let text_slop = if ctx.page_scale > 0.0 {
            self.text_hit_slop_px / ctx.page_scale
        } else {
            0.0
        };
        (0..count)
            .map(|i| (i + self.last_hit + rotate) % count)
            .map(|j| (j, &ctx.annotations[j]))
            .find(|(_, annotation)| {
                let rect = if annotation.kind.is_text() {
                    annotation.rect.expanded(text_slop)
                } else {
                    annotation.rect
                };
                rect.contains_point(point)
            })
    }

    fn find_sidecar<'a>(&self, ctx: &HitContext<'a>, point: &PageCoordinate) -> Option<&'a SidecarNote> {
        let text_slop = if ctx.page_scale > 0.0 {
            self.text_hit_slop_px / ctx.page_scale
        } else {
            0.0
        };
        ctx.sidecar_notes
            .iter()
            .find(|note| note.bounds.expanded(text_slop).contains_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> HitTestResolver {
        HitTestResolver::new(&GestureConfig::default())
    }

    fn tap(x: f32, y: f32, time_ms: u64) -> Tap {
        Tap {
            point: PageCoordinate::new(x, y),
            time_ms,
            duration_ms: 80,
        }
    }

    fn overlapping() -> Vec<Annotation> {
        vec![
            Annotation::new(AnnotationKind::Highlight, DocRect::new(0.0, 0.0, 100.0, 100.0))
                .with_object_id(1),
            Annotation::new(AnnotationKind::Ink, DocRect::new(0.0, 0.0, 100.0, 100.0))
                .with_object_id(2),
            Annotation::new(AnnotationKind::Square, DocRect::new(0.0, 0.0, 100.0, 100.0))
                .with_object_id(3),
            Annotation::new(AnnotationKind::Underline, DocRect::new(0.0, 0.0, 100.0, 100.0))
                .with_object_id(4),
        ]
    }

    fn selected_index(outcome: &ClickOutcome) -> Option<usize> {
        match &outcome.selection {
            SelectionUpdate::Selected(selection) => selection.embedded_index(),
            _ => None,
        }
    }

    #[test]
    fn test_link_takes_priority() {
        let links = vec![Link::new(
            DocRect::new(0.0, 0.0, 50.0, 50.0),
            LinkTarget::Internal { page: 3 },
        )];
        let annotations = overlapping();
        let ctx = HitContext {
            links: &links,
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };

        let mut resolver = resolver();
        let outcome = resolver.pass_click(&ctx, &tap(10.0, 10.0, 0));
        assert_eq!(outcome.hit, Hit::LinkInternal);
        assert_eq!(outcome.link, Some(LinkTarget::Internal { page: 3 }));
        assert_eq!(outcome.selection, SelectionUpdate::Unchanged);
    }

    #[test]
    fn test_repeated_taps_cycle_overlapping() {
        let annotations = overlapping();
        let ctx = HitContext {
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };
        let mut resolver = resolver();

        let order: Vec<usize> = (0..6)
            .map(|i| selected_index(&resolver.pass_click(&ctx, &tap(50.0, 50.0, i * 1000))).unwrap())
            .collect();

        assert_eq!(order, vec![1, 2, 3, 0, 1, 2]);
    }

    #[test]
    fn test_unhittable_kind_is_selected_but_reports_nothing() {
        let annotations = overlapping();
        let ctx = HitContext {
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };
        let mut resolver = resolver();

        resolver.pass_click(&ctx, &tap(50.0, 50.0, 0));
        let outcome = resolver.pass_click(&ctx, &tap(50.0, 50.0, 1000));

        // the square stops the search instead of being stepped over
        assert_eq!(selected_index(&outcome), Some(2));
        assert_eq!(outcome.hit, Hit::Nothing);
        assert_eq!(resolver.last_hit(), 2);
        assert!(!outcome.edit_requested);

        let next = resolver.pass_click(&ctx, &tap(50.0, 50.0, 2000));
        assert_eq!(selected_index(&next), Some(3));
        assert_eq!(next.hit, Hit::Annotation);
    }

    #[test]
    fn test_would_hit_has_no_side_effects() {
        let annotations = overlapping();
        let ctx = HitContext {
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };
        let resolver = resolver();

        let point = PageCoordinate::new(50.0, 50.0);
        assert_eq!(resolver.would_hit(&ctx, &point), Hit::Annotation);
        assert_eq!(resolver.would_hit(&ctx, &point), Hit::Annotation);
        assert_eq!(resolver.last_hit(), 0);
    }

    #[test]
    fn test_widgets_need_script_support() {
        let widgets = vec![DocRect::new(200.0, 200.0, 300.0, 230.0)];
        let mut ctx = HitContext {
            widget_areas: &widgets,
            ..HitContext::empty(1.0)
        };
        let mut resolver = resolver();
        assert_eq!(resolver.pass_click(&ctx, &tap(250.0, 210.0, 0)).hit, Hit::Nothing);

        ctx.javascript_supported = true;
        let outcome = resolver.pass_click(&ctx, &tap(250.0, 210.0, 5000));
        assert_eq!(outcome.hit, Hit::Widget);
        assert_eq!(outcome.selection, SelectionUpdate::Cleared);
    }

    #[test]
    fn test_text_annotation_has_enlarged_slop() {
        let annotations = vec![
            Annotation::new(AnnotationKind::FreeText, DocRect::new(10.0, 10.0, 110.0, 40.0))
                .with_object_id(7),
        ];
        let ctx = HitContext {
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };
        let resolver = resolver();
        assert_eq!(
            resolver.would_hit(&ctx, &PageCoordinate::new(5.0, 25.0)),
            Hit::TextAnnotation
        );
        assert_eq!(
            resolver.would_hit(&ctx, &PageCoordinate::new(0.0, 25.0)),
            Hit::Nothing
        );
    }

    #[test]
    fn test_second_tap_on_selected_text_requests_edit() {
        let annotations = vec![
            Annotation::new(AnnotationKind::FreeText, DocRect::new(10.0, 10.0, 110.0, 40.0))
                .with_object_id(7),
        ];
        let mut resolver = resolver();

        let ctx = HitContext {
            annotations: &annotations,
            ..HitContext::empty(1.0)
        };
        let first = resolver.pass_click(&ctx, &tap(50.0, 25.0, 0));
        assert_eq!(first.hit, Hit::TextAnnotation);
        assert!(!first.edit_requested);

        let selection = match first.selection {
            SelectionUpdate::Selected(selection) => selection,
            other => panic!("expected selection, got {:?}", other),
        };
        let ctx = HitContext {
            annotations: &annotations,
            selected: Some(&selection),
            ..HitContext::empty(1.0)
        };
        let second = resolver.pass_click(&ctx, &tap(50.0, 25.0, 2000));
        assert!(second.edit_requested);

        // a long press on the selection is not an edit
        let mut long = tap(50.0, 25.0, 4000);
        long.duration_ms = 800;
        assert!(!resolver.pass_click(&ctx, &long).edit_requested);

        // nor is a tap that grabs a handle
        let on_handle = HitContext {
            on_handle: true,
            ..ctx
        };
        assert!(!resolver.pass_click(&on_handle, &tap(50.0, 25.0, 6000)).edit_requested);
    }

    #[test]
    fn test_near_miss_double_tap_requests_edit() {
        let note = SidecarNote::new("n1", DocRect::new(100.0, 100.0, 200.0, 150.0));
        let selection = Selection::sidecar(&note);
        let ctx = HitContext {
            selected: Some(&selection),
            ..HitContext::empty(1.0)
        };
        let mut resolver = resolver();

        // just outside the note's hit area, twice within the double-tap window
        let first = resolver.pass_click(&ctx, &tap(95.0, 160.0, 1000));
        assert_eq!(first.selection, SelectionUpdate::Cleared);

        let second = resolver.pass_click(&ctx, &tap(96.0, 161.0, 1200));
        assert!(second.edit_requested);
        assert_eq!(second.selection, SelectionUpdate::Unchanged);

        // too slow for a double tap
        let third = resolver.pass_click(&ctx, &tap(96.0, 161.0, 2000));
        assert!(!third.edit_requested);
    }
}
