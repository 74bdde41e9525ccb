//! Gesture router
//!
//! Single entry point for the raw pointer stream of one viewport. Each
//! gesture ends up with exactly one handler, chosen from the interaction
//! mode and from what the gesture starts on:
//! - Drawing/Erasing: the ink session (only stylus pointers in stylus mode)
//! - Selecting, starting on a selection marker: marker drag
//! - starting on or near the selected text annotation: move/resize
//! - everything else: pan, pinch, fling and tap handling on the pager
//!
//! Long-press, selection retry and stylus decay run on the router's virtual
//! clock. Pointer events carry their own timestamp; between events the host
//! advances the clock with [`GestureRouter::tick`], which also drains page
//! content published by the engine and steps pager animations.
//!
//! Everything the host has to react to is queued as a [`ReaderEvent`] and
//! collected with [`GestureRouter::drain_events`].

use crate::drawing_router::{DrawingGestureRouter, InkAction, StrokeMode};
use crate::event::{Notice, PointerAction, PointerEvent, ReaderEvent, ReaderTimer};
use crate::longpress::{
    LongPressAction, LongPressDisambiguator, PendingPress, RetryOrigin, RetryOutcome, SelectionRetry,
};
use crate::mode::{InteractionMode, ModeChange, ModeController, ModeInterceptor};
use crate::pager::{PageAdapter, Pager, PagerEvent};
use crate::persistence::{PersistError, PersistResult, ReaderState, SavedState, STATE_VERSION};
use crate::selection::MarkerDrag;
use crate::stylus::StylusTracker;
use crate::transform::{screen_to_doc, ScreenFrame};
use pdf_reader_core::{
    AnnotationRef, AnnotationStyle, ClickOutcome, ContentRequest, DocRect, DocSize, DocumentEngine,
    DrawingSession, GestureConfig, Hit, HitContext, HitTestResolver, ManipulationKind, PageContent,
    PageCoordinate, PageFrame, PointerSample, PreferencesSource, RectCommit, Release, RenderSink,
    ScreenOffset, ScreenPoint, ScrollOutcome, Selection, SelectionKind, SelectionUpdate, Tap,
    TextAnnotationManipulator, TextSelection,
};
use pdf_reader_scheduler::{TaskId, TimerQueue};

/// Collaborators the router talks to
pub struct RouterPorts {
    pub engine: Box<dyn DocumentEngine>,
    pub render: Box<dyn RenderSink>,
    pub preferences: Box<dyn PreferencesSource>,
}

/// Transient decoration drawn above the current page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    /// Live rectangle of a text annotation being moved or resized
    pub selection_box: Option<DocRect>,
    /// Contents drawn inside the live rectangle until the commit re-renders
    pub preview_text: Option<String>,
}

/// Handler a gesture was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Still inside the touch slop
    Undecided,
    Ink,
    Marker,
    Manipulation,
    /// Drag on a locked annotation
    Locked,
    Pan,
    /// Swallowed without effect
    Consumed,
}

/// One pointer gesture, from down to up or cancel
#[derive(Debug, Clone)]
struct Gesture {
    page: usize,
    frame: Option<ScreenFrame>,
    down_screen: ScreenPoint,
    down_doc: Option<PageCoordinate>,
    down_ms: u64,
    route: Route,
    beyond_slop: bool,
    multi_touch: bool,
    /// Pan already applied, relative to the down point
    panned: (i32, i32),
    doc_motion_sent: bool,
}

impl Gesture {
    fn doc(&self, point: ScreenPoint) -> Option<PageCoordinate> {
        self.frame.and_then(|frame| screen_to_doc(point, &frame))
    }

    fn sample(&self, point: ScreenPoint, time_ms: u64) -> Option<PointerSample> {
        self.doc(point)
            .map(|doc| PointerSample::new(point, doc, time_ms))
    }

    fn start_sample(&self) -> Option<PointerSample> {
        self.down_doc
            .map(|doc| PointerSample::new(self.down_screen, doc, self.down_ms))
    }
}

pub struct GestureRouter<A: PageAdapter> {
    config: GestureConfig,
    modes: ModeController,
    pager: Pager<A>,
    resolver: HitTestResolver,
    session: DrawingSession,
    ink: DrawingGestureRouter,
    /// Page the session's strokes were drawn on
    ink_page: Option<usize>,
    manipulator: TextAnnotationManipulator,
    long_press: LongPressDisambiguator,
    retry: SelectionRetry,
    stylus: StylusTracker,
    markers: MarkerDrag,
    content: PageContent,
    generation: u64,
    timers: TimerQueue<ReaderTimer>,
    events: Vec<ReaderEvent>,
    engine: Box<dyn DocumentEngine>,
    render: Box<dyn RenderSink>,
    preferences: Box<dyn PreferencesSource>,
    selection: Option<Selection>,
    text_selection: Option<TextSelection>,
    overlay: OverlayState,
    gesture: Option<Gesture>,
    last_down_doc: Option<PageCoordinate>,
    /// Set by a pinch; cleared by the next down
    tap_disabled: bool,
    scaling: bool,
    now_ms: u64,
}

impl<A: PageAdapter> GestureRouter<A> {
    /// Build a router around a laid-out pager and start loading the
    /// current page's content
    pub fn new(mut pager: Pager<A>, config: GestureConfig, ports: RouterPorts) -> Self {
        let RouterPorts {
            engine,
            render,
            preferences,
        } = ports;
        pager.set_fit_width(preferences.snapshot().fit_width);
        let page = pager.current();

        let mut router = Self {
            modes: ModeController::new(),
            resolver: HitTestResolver::new(&config),
            session: DrawingSession::new(),
            ink: DrawingGestureRouter::new(config.drawing_slop_px),
            ink_page: None,
            manipulator: TextAnnotationManipulator::new(&config),
            long_press: LongPressDisambiguator::new(&config),
            retry: SelectionRetry::new(&config),
            stylus: StylusTracker::new(config.long_press_timeout_ms),
            markers: MarkerDrag::new(&config),
            content: PageContent::new(page, 1),
            generation: 1,
            timers: TimerQueue::new(),
            events: Vec::new(),
            engine,
            render,
            preferences,
            selection: None,
            text_selection: None,
            overlay: OverlayState::default(),
            gesture: None,
            last_down_doc: None,
            tap_disabled: false,
            scaling: false,
            now_ms: 0,
            pager,
            config,
        };
        router.request_content();
        router.pump_pager();
        router
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn mode(&self) -> InteractionMode {
        self.modes.mode()
    }

    pub fn pager(&self) -> &Pager<A> {
        &self.pager
    }

    /// Direct pager access for jumps and scale requests; notifications are
    /// picked up on the next router call
    pub fn pager_mut(&mut self) -> &mut Pager<A> {
        &mut self.pager
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn text_selection(&self) -> Option<&TextSelection> {
        self.text_selection.as_ref()
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    pub fn content(&self) -> &PageContent {
        &self.content
    }

    pub fn is_tap_disabled(&self) -> bool {
        self.tap_disabled
    }

    /// Enable or disable the corner resize handles
    pub fn set_resize_enabled(&mut self, enabled: bool) {
        self.manipulator.set_resize_enabled(enabled);
        self.render.invalidate_overlay(self.content.page);
    }

    pub fn set_mode_interceptor(&mut self, interceptor: Box<dyn ModeInterceptor>) {
        self.modes.set_interceptor(interceptor);
    }

    pub fn clear_mode_interceptor(&mut self) {
        self.modes.clear_interceptor();
    }

    pub fn drain_events(&mut self) -> Vec<ReaderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Feed one raw pointer event
    pub fn on_pointer(&mut self, event: PointerEvent) {
        self.fire_timers(event.time_ms);
        if event.is_stylus() {
            self.stylus.mark(self.now_ms, &mut self.timers);
        }
        match event.action {
            PointerAction::Down => self.on_down(&event),
            PointerAction::Move => self.on_move(&event),
            PointerAction::Up => self.on_up(&event),
            PointerAction::Cancel => self.on_cancel(&event),
            PointerAction::SecondaryDown => self.on_secondary_down(),
            PointerAction::SecondaryUp => {}
        }
        self.pump_pager();
    }

    /// Advance the clock: apply loaded content, fire due timers and step
    /// pager animations
    pub fn tick(&mut self, now_ms: u64) {
        self.drain_content();
        self.fire_timers(now_ms);
        self.pager.step(self.now_ms);
        self.pump_pager();
    }

    /// Request a mode change through the mode controller
    pub fn set_mode(&mut self, to: InteractionMode) -> ModeChange {
        let change = self.modes.request(to);
        if let ModeChange::Changed {
            from,
            to,
            commit_ink,
        } = change
        {
            if commit_ink {
                self.commit_drawing();
            }
            self.after_mode_change(from, to);
        }
        change
    }

    /// Pinch start; refused while the stylus was just in use in stylus mode
    pub fn on_scale_begin(&mut self, focus: ScreenPoint) -> bool {
        let prefs = self.preferences.snapshot();
        if self.stylus.should_block_scale(prefs.use_stylus) {
            log::debug!("pinch blocked: stylus recently active");
            return false;
        }
        self.long_press.cancel();
        self.tap_disabled = true;
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.multi_touch = true;
        }
        self.manipulator.on_secondary_down();
        self.clear_preview();
        self.scaling = true;
        self.pager.scale_begin(focus_offset(focus));
        self.pump_pager();
        true
    }

    pub fn on_scale(&mut self, factor: f32, focus: ScreenPoint) {
        if !self.scaling {
            return;
        }
        self.pager.scale(factor, focus_offset(focus));
        self.pump_pager();
    }

    pub fn on_scale_end(&mut self) {
        if !self.scaling {
            return;
        }
        self.scaling = false;
        self.pager.scale_end();
        self.pump_pager();
    }

    /// Fling with release velocity `(vx, vy)` in px/s
    ///
    /// Returns whether the fling reached the pager.
    pub fn on_fling(&mut self, vx: f32, vy: f32) -> bool {
        let handled = self.handle_fling(vx, vy);
        self.pump_pager();
        handled
    }

    /// Save the session's strokes as an ink annotation and clear it
    ///
    /// On failure the strokes stay in the session. Returns whether anything
    /// was saved.
    pub fn commit_drawing(&mut self) -> bool {
        if self.session.stroke_count() == 0 {
            return false;
        }
        let page = self.ink_page.unwrap_or(self.content.page);
        let snapshot = self.session.snapshot();
        let strokes = self.session.take_strokes();
        match self.engine.add_ink_annotation(page, &strokes) {
            Ok(()) => {
                log::debug!("saved {} strokes on page {}", strokes.len(), page);
                self.ink_page = None;
                self.events.push(ReaderEvent::StrokeCountChanged(0));
                self.render.invalidate_overlay(page);
                if page == self.content.page {
                    self.reload_content();
                }
                true
            }
            Err(err) => {
                log::error!("failed to save ink on page {}: {}", page, err);
                self.session.restore(snapshot);
                false
            }
        }
    }

    /// Undo the last draw or erase step
    pub fn undo_drawing(&mut self) -> bool {
        let undone = self.session.undo();
        if undone {
            self.events
                .push(ReaderEvent::StrokeCountChanged(self.session.stroke_count()));
            self.render.invalidate_overlay(self.content.page);
        }
        undone
    }

    /// Drop every stroke without saving
    pub fn cancel_drawing(&mut self) {
        self.session.cancel();
        self.ink_page = None;
        self.events.push(ReaderEvent::StrokeCountChanged(0));
        self.render.invalidate_overlay(self.content.page);
    }

    pub fn delete_selected_annotation(&mut self) -> bool {
        let Some(target) = self.selection.as_ref().and_then(Selection::target) else {
            return false;
        };
        let page = self.content.page;
        match self.engine.delete_annotation(page, &target) {
            Ok(()) => {
                log::debug!("deleted {} on page {}", target, page);
                self.deselect_annotation();
                self.reload_content();
                true
            }
            Err(err) => {
                log::error!("failed to delete {} on page {}: {}", target, page, err);
                false
            }
        }
    }

    pub fn restyle_selected_annotation(&mut self, style: &AnnotationStyle) -> bool {
        let Some(target) = self.selection.as_ref().and_then(Selection::target) else {
            return false;
        };
        let page = self.content.page;
        match self.engine.update_style(page, &target, style) {
            Ok(()) => {
                self.reload_content();
                true
            }
            Err(err) => {
                log::error!("failed to restyle {} on page {}: {}", target, page, err);
                false
            }
        }
    }

    /// Translate the members offered by a `GroupMoveOffered` event
    ///
    /// Returns how many members moved.
    pub fn apply_group_move(&mut self, page: usize, members: &[AnnotationRef], dx: f32, dy: f32) -> usize {
        let engine = &mut self.engine;
        let moved = members
            .iter()
            .filter(|member| match engine.translate_annotation(page, member, dx, dy) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("failed to move group member {} on page {}: {}", member, page, err);
                    false
                }
            })
            .count();
        if moved > 0 && page == self.content.page {
            self.reload_content();
        }
        moved
    }

    /// Ask the engine to reload the current page's content
    ///
    /// Loaded values stay in use until the new ones arrive.
    pub fn reload_content(&mut self) {
        self.generation += 1;
        self.content.refresh(self.generation);
        self.request_content();
    }

    pub fn save_state(&self) -> SavedState {
        let reader = ReaderState {
            mode: self.modes.mode(),
            pager: self.pager.to_state(),
        };
        SavedState::new(reader, self.session.snapshot())
    }

    /// Restore mode, pager position and the drawing session
    ///
    /// The mode is forced without consulting the interceptor.
    pub fn restore_state(&mut self, saved: SavedState) -> PersistResult<()> {
        if saved.version != STATE_VERSION {
            return Err(PersistError::UnsupportedVersion(saved.version));
        }
        let reader = saved.reader.clamped(self.pager.count())?;
        if let ModeChange::Changed { from, to, .. } = self.modes.force(reader.mode) {
            self.after_mode_change(from, to);
        }
        self.pager.restore_state(&reader.pager);
        self.pump_pager();

        self.session.restore(saved.drawing);
        let count = self.session.stroke_count();
        self.ink_page = (count > 0).then_some(self.content.page);
        self.events.push(ReaderEvent::StrokeCountChanged(count));
        self.render.invalidate_overlay(self.content.page);
        Ok(())
    }

    pub fn save_json(&self) -> PersistResult<String> {
        self.save_state().to_json()
    }

    pub fn restore_json(&mut self, json: &str) -> PersistResult<()> {
        let saved = SavedState::from_json(json)?;
        self.restore_state(saved)
    }

    fn on_down(&mut self, event: &PointerEvent) {
        let now = self.now_ms;
        let point = event.position;
        let stylus = event.is_stylus();
        self.tap_disabled = false;
        self.pager.pointer_down();

        let page = self.pager.current();
        let frame = self.pager.current_frame();
        let scale = frame.map_or(0.0, |frame| frame.scale);
        let doc = frame.and_then(|frame| screen_to_doc(point, &frame));
        self.last_down_doc = doc;
        self.gesture = Some(Gesture {
            page,
            frame,
            down_screen: point,
            down_doc: doc,
            down_ms: now,
            route: Route::Undecided,
            beyond_slop: false,
            multi_touch: false,
            panned: (0, 0),
            doc_motion_sent: false,
        });

        let prefs = self.preferences.snapshot();
        let consumed = stylus
            && prefs.use_stylus
            && self.modes.mode() == InteractionMode::Viewing
            && self.stylus_down_in_viewing(doc, scale);
        let mode = self.modes.mode();

        if let Some(doc) = doc {
            let sample = PointerSample::new(point, doc, now);
            self.manipulator
                .on_down(sample, self.selection.as_ref(), scale);
        }

        let on_marker = match doc {
            Some(doc) if mode == InteractionMode::Selecting => self.markers.begin(
                self.text_selection.as_ref(),
                self.content.text_lines(),
                &doc,
                scale,
            ),
            _ => {
                self.markers.end();
                false
            }
        };

        let inks = !consumed && mode.consumes_ink() && (!prefs.use_stylus || stylus);
        let route = if consumed {
            Route::Consumed
        } else if inks {
            Route::Ink
        } else if on_marker {
            Route::Marker
        } else {
            Route::Undecided
        };
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.route = route;
        }
        if inks {
            self.apply_ink(page, frame, PointerAction::Down, point);
        }
        if consumed {
            return;
        }

        let on_selected_text = match (&self.selection, doc) {
            (Some(selection), Some(doc)) => {
                selection.is_text_annotation() && selection.bounds.contains_point(&doc)
            }
            _ => false,
        };
        let probe = doc
            .filter(|_| scale > 0.0)
            .map(|doc| self.probe_at(doc, scale));
        let press = PendingPress {
            screen: point,
            page,
            probe,
            stylus,
            on_selected_text,
        };
        self.long_press
            .on_down(press, mode, on_marker, now, &mut self.timers, &mut self.retry);
    }

    /// Stylus down in viewing mode with stylus mode on
    ///
    /// On an ink annotation the stylus selects it for editing; anywhere else
    /// it switches to drawing. Returns whether the gesture is used up.
    fn stylus_down_in_viewing(&mut self, doc: Option<PageCoordinate>, scale: f32) -> bool {
        let Some(doc) = doc.filter(|_| scale > 0.0) else {
            return false;
        };
        let js = self.engine.javascript_supported();
        let hit = {
            let ctx = hit_context(&self.content, self.selection.as_ref(), js, scale, false);
            self.resolver.would_hit(&ctx, &doc)
        };

        if hit == Hit::InkAnnotation {
            let tap = Tap {
                point: doc,
                time_ms: self.now_ms,
                duration_ms: 0,
            };
            let outcome = {
                let ctx = hit_context(&self.content, self.selection.as_ref(), js, scale, false);
                self.resolver.pass_click(&ctx, &tap)
            };
            if let SelectionUpdate::Selected(selection) = outcome.selection {
                self.select_annotation(selection.clone());
                self.events.push(ReaderEvent::EditAnnotation(selection));
            }
            return true;
        }

        self.deselect_annotation();
        self.set_mode(InteractionMode::Drawing);
        false
    }

    fn on_move(&mut self, event: &PointerEvent) {
        let point = event.position;
        self.long_press.on_move(&point);

        let slop = self.config.touch_slop_px();
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        if !gesture.beyond_slop && gesture.down_screen.exceeds_slop(&point, slop) {
            gesture.beyond_slop = true;
        }
        let gesture = gesture.clone();

        if gesture.route == Route::Ink {
            for sample in &event.history {
                self.apply_ink(gesture.page, gesture.frame, PointerAction::Move, *sample);
            }
            self.apply_ink(gesture.page, gesture.frame, PointerAction::Move, point);
            return;
        }

        if let Some(sample) = gesture.sample(point, self.now_ms) {
            self.manipulator.on_move(sample);
        }
        if gesture.beyond_slop && !gesture.multi_touch && !self.scaling {
            self.scroll_step(&gesture, point);
        }
    }

    /// One drag step past the touch slop; the first one decides the route
    fn scroll_step(&mut self, gesture: &Gesture, point: ScreenPoint) {
        let mode = self.modes.mode();
        match gesture.route {
            Route::Undecided => {
                let route = if mode.accepts_manipulation() {
                    match self.manipulation_step(gesture, point) {
                        ScrollOutcome::Preview(_) => Route::Manipulation,
                        ScrollOutcome::Locked => {
                            self.events.push(ReaderEvent::Notice(Notice::PositionLocked));
                            Route::Locked
                        }
                        ScrollOutcome::NotHandled => {
                            self.pan_step(point);
                            Route::Pan
                        }
                    }
                } else if mode == InteractionMode::Selecting {
                    self.pan_step(point);
                    Route::Pan
                } else {
                    Route::Consumed
                };
                if let Some(current) = self.gesture.as_mut() {
                    current.route = route;
                }
            }
            Route::Manipulation => {
                self.manipulation_step(gesture, point);
            }
            Route::Marker => self.marker_step(gesture, point),
            Route::Pan => self.pan_step(point),
            Route::Ink | Route::Locked | Route::Consumed => {}
        }
    }

    fn manipulation_step(&mut self, gesture: &Gesture, point: ScreenPoint) -> ScrollOutcome {
        let (Some(start), Some(current), Some(frame)) = (
            gesture.start_sample(),
            gesture.sample(point, self.now_ms),
            gesture.frame,
        ) else {
            return ScrollOutcome::NotHandled;
        };
        let Some(size) = self.pager.page_size(gesture.page) else {
            return ScrollOutcome::NotHandled;
        };
        let page_frame = PageFrame {
            size,
            scale: frame.scale,
        };
        let outcome = self
            .manipulator
            .on_scroll(start, current, self.selection.as_ref(), page_frame);
        if let ScrollOutcome::Preview(rect) = outcome {
            self.preview(gesture.page, rect);
        }
        outcome
    }

    fn marker_step(&mut self, gesture: &Gesture, point: ScreenPoint) {
        let Some(doc) = gesture.doc(point) else {
            return;
        };
        let Some(selection) = self.text_selection.as_mut() else {
            return;
        };
        if self.markers.drag(selection, self.content.text_lines(), &doc) {
            self.render.invalidate_overlay(gesture.page);
        }
    }

    fn pan_step(&mut self, point: ScreenPoint) {
        let mode = self.modes.mode();
        let tap_disabled = self.tap_disabled;
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let total_x = (point.x - gesture.down_screen.x).round() as i32;
        let total_y = (point.y - gesture.down_screen.y).round() as i32;
        let (dx, dy) = (total_x - gesture.panned.0, total_y - gesture.panned.1);
        gesture.panned = (total_x, total_y);

        let announce = !gesture.doc_motion_sent
            && !tap_disabled
            && matches!(
                mode,
                InteractionMode::Viewing
                    | InteractionMode::Searching
                    | InteractionMode::AddingTextAnnotation
            );
        if announce {
            gesture.doc_motion_sent = true;
            self.events.push(ReaderEvent::DocMotion);
        }
        self.pager.scroll_by(dx, dy);
    }

    fn on_up(&mut self, event: &PointerEvent) {
        let point = event.position;
        let Some(gesture) = self.gesture.take() else {
            self.pager.pointer_released();
            return;
        };

        if let Release::Commit(commit) = self.manipulator.on_up(self.now_ms) {
            self.commit_rect(gesture.page, commit);
        }

        match gesture.route {
            Route::Ink => {
                for sample in &event.history {
                    self.apply_ink(gesture.page, gesture.frame, PointerAction::Move, *sample);
                }
                self.apply_ink(gesture.page, gesture.frame, PointerAction::Up, point);
            }
            Route::Marker => {
                self.markers.end();
                if gesture.beyond_slop {
                    self.emit_text_selected();
                }
            }
            _ => {}
        }

        let held = self.now_ms.saturating_sub(gesture.down_ms);
        let is_tap = gesture.route == Route::Undecided
            && !gesture.beyond_slop
            && !gesture.multi_touch
            && !self.tap_disabled
            && held < self.config.long_press_timeout_ms;
        if is_tap {
            self.long_press.cancel();
            self.handle_tap(&gesture, point, held);
        } else if let Some((vx, vy)) = event.velocity {
            if gesture.route == Route::Pan && vx.hypot(vy) >= self.config.min_fling_velocity {
                self.handle_fling(vx, vy);
            }
        }

        self.long_press.cancel();
        self.pager.pointer_released();
    }

    fn on_cancel(&mut self, event: &PointerEvent) {
        self.manipulator.on_cancel();
        self.clear_preview();
        if let Some(gesture) = self.gesture.take() {
            if gesture.route == Route::Ink {
                self.apply_ink(gesture.page, gesture.frame, PointerAction::Cancel, event.position);
            }
        }
        self.long_press.cancel();
        self.markers.end();
        self.pager.pointer_released();
    }

    /// A second pointer went down; pinch takes over from any manipulation
    fn on_secondary_down(&mut self) {
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.multi_touch = true;
        }
        if self.manipulator.on_secondary_down().is_some() {
            log::debug!("manipulation handed over to pinch");
        }
        self.clear_preview();
        self.long_press.cancel();
    }

    fn handle_fling(&mut self, vx: f32, vy: f32) -> bool {
        self.long_press.cancel();
        let mode = self.modes.mode();
        if mode.accepts_manipulation() {
            if let (Some(start), Some(frame)) = (self.last_down_doc, self.pager.current_frame()) {
                let suppressed =
                    self.manipulator
                        .fling_suppressed(&start, self.selection.as_ref(), frame.scale);
                if suppressed {
                    log::debug!("fling swallowed near the selected text annotation");
                    return false;
                }
            }
        }
        if !mode.may_switch_page() {
            return false;
        }
        self.pager.fling(vx, vy);
        true
    }

    fn handle_tap(&mut self, gesture: &Gesture, point: ScreenPoint, held: u64) {
        let mode = self.modes.mode();
        if mode.consumes_ink() {
            return;
        }
        let (Some(doc), Some(frame)) = (gesture.doc(point), gesture.frame) else {
            if mode.may_switch_page() {
                self.tap_margins(point);
            }
            return;
        };

        let had_selected_text = self
            .selection
            .as_ref()
            .is_some_and(Selection::is_text_annotation);
        let on_handle = self
            .selection
            .as_ref()
            .is_some_and(|selection| self.manipulator.handle_at(selection, &doc, frame.scale).is_some());
        let js = self.engine.javascript_supported();
        let tap = Tap {
            point: doc,
            time_ms: self.now_ms,
            duration_ms: held,
        };
        let outcome = {
            let ctx = hit_context(&self.content, self.selection.as_ref(), js, frame.scale, on_handle);
            self.resolver.pass_click(&ctx, &tap)
        };
        self.apply_click(gesture.page, doc, &outcome);

        match mode {
            InteractionMode::Viewing | InteractionMode::Searching => {
                if let Some(target) = outcome.link {
                    self.events.push(ReaderEvent::LinkActivated(target));
                } else if outcome.hit == Hit::Nothing {
                    if had_selected_text {
                        self.events.push(ReaderEvent::TapMainArea);
                    } else {
                        self.tap_margins(point);
                    }
                }
            }
            InteractionMode::AddingTextAnnotation => self.add_text_box(gesture.page, doc, frame.scale),
            InteractionMode::Selecting => {
                if outcome.hit == Hit::Nothing {
                    self.select_text_at(gesture.page, doc, frame.scale);
                }
            }
            InteractionMode::Drawing | InteractionMode::Erasing => {}
        }
    }

    /// Selection side effects and widget forwarding of a resolved tap
    fn apply_click(&mut self, page: usize, doc: PageCoordinate, outcome: &ClickOutcome) {
        match &outcome.selection {
            SelectionUpdate::Selected(selection) => self.select_annotation(selection.clone()),
            SelectionUpdate::Cleared => self.deselect_annotation(),
            SelectionUpdate::Unchanged => {}
        }
        if outcome.edit_requested {
            if let Some(selection) = self.selection.clone() {
                self.events.push(ReaderEvent::EditAnnotation(selection));
            }
        }
        if outcome.hit == Hit::Widget {
            match self.engine.pass_click(page, doc) {
                Ok(click) => {
                    if click.changed {
                        self.reload_content();
                    }
                    self.events.push(ReaderEvent::WidgetActivated {
                        page,
                        action: click.action,
                    });
                }
                Err(err) => log::error!("widget tap on page {} failed: {}", page, err),
            }
        }
    }

    fn tap_margins(&mut self, point: ScreenPoint) {
        let container = self.pager.container();
        let width = container.width as f32;
        let height = container.height as f32;
        let margin = self.config.tap_page_margin_for(width);

        let event = if point.x > width - margin {
            ReaderEvent::TapNextMargin
        } else if point.x < margin {
            ReaderEvent::TapPreviousMargin
        } else if point.y > height - margin {
            ReaderEvent::TapNextMargin
        } else if point.y < margin {
            ReaderEvent::TapPreviousMargin
        } else {
            ReaderEvent::TapMainArea
        };
        self.events.push(event);
    }

    /// Tap in adding mode: create a FreeText box at the tap and go back to
    /// viewing
    fn add_text_box(&mut self, page: usize, anchor: PageCoordinate, scale: f32) {
        match self.engine.page_size(page) {
            Ok(size) if scale > 0.0 => {
                let width = self.config.text_annot_default_width_dp * self.config.density / scale;
                let height = self.config.text_annot_default_height_dp * self.config.density / scale;
                let rect = place_text_box(anchor, size, width, height);
                match self.engine.add_text_annotation(page, rect, "") {
                    Ok(target) => {
                        log::debug!("added text annotation {} on page {}", target, page);
                        self.reload_content();
                    }
                    Err(err) => log::error!("failed to add text annotation on page {}: {}", page, err),
                }
            }
            Ok(_) => {}
            Err(err) => log::error!("cannot place text annotation on page {}: {}", page, err),
        }
        self.set_mode(InteractionMode::Viewing);
        self.events.push(ReaderEvent::TapMainArea);
    }

    /// Tap in selecting mode on plain page content
    fn select_text_at(&mut self, page: usize, doc: PageCoordinate, scale: f32) {
        self.retry.cancel();
        self.deselect_annotation();
        self.clear_text_selection();
        let probe = self.probe_at(doc, scale);
        if !self.try_select_text(&probe) {
            self.retry
                .start(RetryOrigin::Tap, page, probe, self.now_ms, &mut self.timers);
        }
    }

    /// Text selection probe anchored at `doc`
    fn probe_at(&self, doc: PageCoordinate, scale: f32) -> DocRect {
        let size = self.config.selection_probe_size_px / scale;
        DocRect::new(doc.x, doc.y, doc.x + size, doc.y + size)
    }

    fn try_select_text(&mut self, probe: &DocRect) -> bool {
        let Some(selection) = TextSelection::select(self.content.text_lines(), probe) else {
            return false;
        };
        self.text_selection = Some(selection);
        self.emit_text_selected();
        true
    }

    fn emit_text_selected(&mut self) {
        let Some(selection) = self.text_selection.as_ref() else {
            return;
        };
        let lines = self.content.text_lines();
        let event = ReaderEvent::TextSelected {
            page: self.content.page,
            text: selection.text(lines),
            rects: selection.rects(lines),
        };
        self.events.push(event);
        self.render.invalidate_overlay(self.content.page);
    }

    fn clear_text_selection(&mut self) {
        if self.text_selection.take().is_some() {
            self.render.invalidate_overlay(self.content.page);
        }
    }

    fn select_annotation(&mut self, selection: Selection) {
        if self.selection.as_ref() == Some(&selection) {
            return;
        }
        self.selection = Some(selection.clone());
        self.events.push(ReaderEvent::AnnotationSelected(selection));
        self.render.invalidate_overlay(self.content.page);
    }

    fn deselect_annotation(&mut self) {
        if self.selection.take().is_some() {
            self.clear_preview();
            self.events.push(ReaderEvent::SelectionCleared);
            self.render.invalidate_overlay(self.content.page);
        }
    }

    /// Contents shown in the live preview of the selected box
    fn selection_contents(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        match &selection.kind {
            SelectionKind::Embedded { index, .. } => self
                .content
                .annotations()
                .get(*index)
                .and_then(|annotation| annotation.contents.clone()),
            SelectionKind::Sidecar { id } => self
                .content
                .sidecar_notes()
                .iter()
                .find(|note| &note.id == id)
                .map(|note| note.text.clone()),
        }
    }

    fn preview(&mut self, page: usize, rect: DocRect) {
        self.overlay.selection_box = Some(rect);
        if self.overlay.preview_text.is_none() {
            self.overlay.preview_text = self.selection_contents();
        }
        self.render.invalidate_overlay(page);
    }

    fn clear_preview(&mut self) {
        if self.overlay != OverlayState::default() {
            self.overlay = OverlayState::default();
            self.render.invalidate_overlay(self.content.page);
        }
    }

    /// Write a finished move/resize back to the engine
    ///
    /// On failure the selection keeps its old bounds.
    fn commit_rect(&mut self, page: usize, commit: RectCommit) {
        self.clear_preview();
        let result = match &commit.target {
            AnnotationRef::Embedded(id) => self.engine.update_annotation_rect(page, *id, commit.to),
            AnnotationRef::Sidecar(id) => self.engine.update_sidecar_bounds(page, id, commit.to),
        };
        if let Err(err) = result {
            log::error!("failed to update {} on page {}: {}", commit.target, page, err);
            return;
        }

        self.apply_local_rect(&commit.target, commit.to);
        if commit.kind == ManipulationKind::Move {
            let members = self.engine.group_members(page, &commit.target);
            if !members.is_empty() {
                self.events.push(ReaderEvent::GroupMoveOffered {
                    page,
                    target: commit.target.clone(),
                    dx: commit.to.left - commit.from.left,
                    dy: commit.to.top - commit.from.top,
                    members,
                });
            }
        }
        self.reload_content();
    }

    /// Mirror a committed rectangle into the loaded content and selection
    fn apply_local_rect(&mut self, target: &AnnotationRef, rect: DocRect) {
        match target {
            AnnotationRef::Embedded(id) => {
                let annotation = self.content.annotations.as_mut().and_then(|list| {
                    list.iter_mut()
                        .find(|annotation| annotation.stable_id() == Some(*id))
                });
                if let Some(annotation) = annotation {
                    annotation.rect = rect;
                }
            }
            AnnotationRef::Sidecar(id) => {
                let note = self
                    .content
                    .sidecar_notes
                    .as_mut()
                    .and_then(|notes| notes.iter_mut().find(|note| &note.id == id));
                if let Some(note) = note {
                    note.bounds = rect;
                }
            }
        }
        if let Some(selection) = self.selection.as_mut() {
            if selection.target().as_ref() == Some(target) {
                selection.bounds = rect;
            }
        }
    }

    /// Feed the ink gesture router and apply what it produces to the session
    fn apply_ink(&mut self, page: usize, frame: Option<ScreenFrame>, action: PointerAction, point: ScreenPoint) {
        let actions = self.ink.process(action, point);
        let Some(frame) = frame.filter(|frame| frame.scale > 0.0) else {
            return;
        };
        if actions.is_empty() {
            return;
        }

        let prefs = self.preferences.snapshot();
        let radius = prefs.eraser_thickness / frame.scale;
        let to_doc = |point: ScreenPoint| screen_to_doc(point, &frame);
        let mut count_changed = false;
        for action in actions {
            match action {
                InkAction::BeginStroke(point) => {
                    if let Some(doc) = to_doc(point) {
                        self.session.start_draw(doc);
                        self.ink_page = Some(page);
                    }
                }
                InkAction::AppendPoint(point) => {
                    if let Some(doc) = to_doc(point) {
                        self.session.continue_draw(doc);
                    }
                }
                InkAction::EndStroke(_) => {
                    self.session.finish_draw(prefs.ink_thickness / frame.scale);
                    count_changed = true;
                }
                InkAction::BeginErase(point) => {
                    if let Some(doc) = to_doc(point) {
                        self.session.start_erase(doc, radius);
                        self.ink_page = Some(page);
                    }
                }
                InkAction::AppendErase(point) => {
                    if let Some(doc) = to_doc(point) {
                        self.session.continue_erase(doc, radius);
                    }
                }
                InkAction::EndErase(point) => {
                    if let Some(doc) = to_doc(point) {
                        self.session.finish_erase(doc, radius);
                    }
                    count_changed = true;
                }
                InkAction::Cancel => {
                    self.session.undo();
                    count_changed = true;
                }
            }
        }
        if count_changed {
            self.events
                .push(ReaderEvent::StrokeCountChanged(self.session.stroke_count()));
        }
        self.render.invalidate_overlay(page);
    }

    fn after_mode_change(&mut self, from: InteractionMode, to: InteractionMode) {
        self.ink.set_mode(if to == InteractionMode::Erasing {
            StrokeMode::Erase
        } else {
            StrokeMode::Draw
        });
        if from == InteractionMode::Selecting {
            self.retry.cancel();
            self.clear_text_selection();
            self.markers.end();
        }
        if !to.is_selection_compatible() {
            self.deselect_annotation();
        }
        self.events.push(ReaderEvent::ModeChanged { from, to });
        self.render.invalidate_overlay(self.content.page);
    }

    fn fire_timers(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        for (id, timer) in self.timers.advance_to(self.now_ms) {
            match timer {
                ReaderTimer::LongPress => self.on_long_press_fired(id),
                ReaderTimer::SelectionRetry => self.on_retry_fired(id),
                ReaderTimer::StylusDecay => {
                    self.stylus.on_decay(id);
                }
            }
        }
    }

    fn on_long_press_fired(&mut self, id: TaskId) {
        match self.long_press.on_fired(id, self.modes.mode()) {
            LongPressAction::None | LongPressAction::ClearPending => {}
            LongPressAction::AccidentalMark => self.drop_accidental_mark(),
            LongPressAction::SelectText { page, probe } => {
                if page != self.content.page {
                    return;
                }
                self.deselect_annotation();
                self.clear_text_selection();
                if self.try_select_text(&probe) {
                    self.set_mode(InteractionMode::Selecting);
                } else {
                    self.retry
                        .start(RetryOrigin::LongPress, page, probe, self.now_ms, &mut self.timers);
                }
                if let Some(gesture) = self.gesture.as_mut() {
                    gesture.route = Route::Consumed;
                }
            }
        }
    }

    /// A stylus held still in drawing mode left at most one stroke of its
    /// own: drop it, save the rest and go back to viewing
    fn drop_accidental_mark(&mut self) {
        let count = self.session.stroke_count();
        let own_stroke = count == 1 && self.ink.in_progress();
        let pending_tap = count == 0 && self.ink.is_pending_tap();
        if !own_stroke && !pending_tap {
            return;
        }
        log::debug!("dropping accidental stylus mark");
        if own_stroke {
            self.session.undo();
        }
        self.ink.abandon();
        self.commit_drawing();
        self.events
            .push(ReaderEvent::StrokeCountChanged(self.session.stroke_count()));
        self.set_mode(InteractionMode::Viewing);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.route = Route::Consumed;
        }
    }

    fn on_retry_fired(&mut self, id: TaskId) {
        let page = self.content.page;
        let mode = self.modes.mode();
        let lines = self.content.text_lines();
        let mut found = None;
        let outcome = self
            .retry
            .on_fired(id, page, mode, self.now_ms, &mut self.timers, |probe| {
                found = TextSelection::select(lines, probe);
                found.is_some()
            });

        match outcome {
            RetryOutcome::Selected { origin } => {
                self.text_selection = found;
                self.emit_text_selected();
                if origin == RetryOrigin::LongPress {
                    self.set_mode(InteractionMode::Selecting);
                }
            }
            RetryOutcome::Exhausted { origin } => {
                self.clear_text_selection();
                if origin == RetryOrigin::LongPress {
                    self.set_mode(InteractionMode::Viewing);
                }
            }
            RetryOutcome::Ignored | RetryOutcome::Aborted | RetryOutcome::Retrying => {}
        }
    }

    fn drain_content(&mut self) {
        let changes = self.content.drain();
        if changes.annotations {
            self.reresolve_selection();
        }
        if changes.any() {
            self.render.invalidate_overlay(self.content.page);
        }
    }

    /// Find the selected annotation again in a reloaded list
    fn reresolve_selection(&mut self) {
        let Some(current) = self.selection.as_ref() else {
            return;
        };
        match current.reresolve(self.content.annotations(), self.content.sidecar_notes()) {
            Some(resolved) => self.selection = Some(resolved),
            None => {
                log::warn!(
                    "selected annotation is gone after reloading page {}",
                    self.content.page
                );
                self.selection = None;
                self.clear_preview();
                self.events.push(ReaderEvent::SelectionCleared);
            }
        }
    }

    fn request_content(&mut self) {
        self.engine.request_content(ContentRequest {
            page: self.content.page,
            generation: self.content.generation(),
            slots: self.content.slots(),
        });
    }

    fn pump_pager(&mut self) {
        for event in self.pager.drain_events() {
            match event {
                PagerEvent::Settle(page) => self.render.add_hq(page),
                PagerEvent::Unsettle(page) => self.render.remove_hq(page),
                PagerEvent::MoveToChild(page) => self.on_page_changed(page),
                PagerEvent::MoveOffChild(_) => {}
            }
        }
    }

    fn on_page_changed(&mut self, page: usize) {
        if page == self.content.page {
            return;
        }
        log::debug!("current page {} -> {}", self.content.page, page);
        if self.session.stroke_count() > 0 {
            self.commit_drawing();
        }
        self.long_press.cancel();
        self.retry.cancel();
        self.deselect_annotation();
        self.clear_text_selection();
        self.markers.end();
        self.resolver.reset();

        self.generation += 1;
        self.content.retarget(page, self.generation);
        self.request_content();
        self.events.push(ReaderEvent::PageChanged(page));
    }
}

fn focus_offset(focus: ScreenPoint) -> ScreenOffset {
    ScreenOffset::new(focus.x.round() as i32, focus.y.round() as i32)
}

fn hit_context<'a>(
    content: &'a PageContent,
    selected: Option<&'a Selection>,
    javascript_supported: bool,
    page_scale: f32,
    on_handle: bool,
) -> HitContext<'a> {
    HitContext {
        links: content.links(),
        annotations: content.annotations(),
        sidecar_notes: content.sidecar_notes(),
        widget_areas: content.widget_areas(),
        javascript_supported,
        page_scale,
        selected,
        on_handle,
    }
}

/// Rectangle for a new FreeText box anchored at `anchor`
///
/// The requested size is capped at 90 % of the page width and 30 % of its
/// height. A box that would run off the right or bottom edge is pulled back
/// so its far edge sits on the page edge.
pub fn place_text_box(anchor: PageCoordinate, page: DocSize, width: f32, height: f32) -> DocRect {
    let width = width.min(page.width * 0.9).max(1.0);
    let height = height.min(page.height * 0.3).max(1.0);

    let (mut left, mut top) = (anchor.x, anchor.y);
    let (mut right, mut bottom) = (left + width, top + height);
    if right > page.width {
        right = page.width;
        left = (right - width).max(0.0);
    }
    if bottom > page.height {
        bottom = page.height;
        top = (bottom - height).max(0.0);
    }

    left = left.clamp(0.0, page.width);
    top = top.clamp(0.0, page.height);
    right = right.clamp(0.0, page.width);
    bottom = bottom.clamp(0.0, page.height);
    if right <= left {
        right = page.width.min(left + (width * 0.5).max(12.0));
    }
    if bottom <= top {
        bottom = page.height.min(top + (height * 0.5).max(12.0));
    }
    DocRect::new(left, top, right, bottom)
}
