//! Collaborator interfaces
//!
//! The reader core never owns the document model, the renderer or the
//! settings store. It talks to them through these narrow traits, which are
//! injected when the gesture router is built.

use crate::annotation::{AnnotationRef, ObjectId};
use crate::content::PageContentSlots;
use crate::error::EngineResult;
use crate::geometry::{DocRect, DocSize, PageCoordinate};
use crate::ink::Stroke;
use serde::{Deserialize, Serialize};

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

/// Style change applied to an existing annotation
///
/// `None` fields are left as they are.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationStyle {
    pub color: Option<Color>,
    pub thickness: Option<f32>,
    pub font_size: Option<f32>,
}

/// State of a signature field that was tapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    NoSupport,
    Unsigned,
    Signed,
}

/// What the engine wants the host to show after a widget tap
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetAction {
    None,
    EditText(String),
    ChooseOption(Vec<String>),
    Signature(SignatureState),
}

/// Result of passing a tap to a form widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetClick {
    /// The document changed as a result of the tap
    pub changed: bool,
    pub action: WidgetAction,
}

/// Asynchronous load of a page's text, annotations, links and widgets
///
/// The engine fills the slots from a worker thread, publishing with
/// `generation`; results for a generation the reader has moved past are
/// dropped by the slots.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub page: usize,
    pub generation: u64,
    pub slots: PageContentSlots,
}

/// Document model operations the reader needs
pub trait DocumentEngine {
    fn page_count(&self) -> usize;

    fn page_size(&self, page: usize) -> EngineResult<DocSize>;

    /// Whether form widgets are interactive (script support)
    fn javascript_supported(&self) -> bool;

    /// Start loading page content into the request's slots
    fn request_content(&mut self, request: ContentRequest);

    /// Forward a tap on a form widget
    fn pass_click(&mut self, page: usize, point: PageCoordinate) -> EngineResult<WidgetClick>;

    fn update_annotation_rect(&mut self, page: usize, id: ObjectId, rect: DocRect) -> EngineResult<()>;

    fn update_sidecar_bounds(&mut self, page: usize, id: &str, rect: DocRect) -> EngineResult<()>;

    fn update_style(
        &mut self,
        page: usize,
        target: &AnnotationRef,
        style: &AnnotationStyle,
    ) -> EngineResult<()>;

    fn add_ink_annotation(&mut self, page: usize, strokes: &[Stroke]) -> EngineResult<()>;

    /// Create a FreeText annotation and return its address
    fn add_text_annotation(&mut self, page: usize, rect: DocRect, contents: &str)
        -> EngineResult<AnnotationRef>;

    fn delete_annotation(&mut self, page: usize, target: &AnnotationRef) -> EngineResult<()>;

    /// Annotations explicitly grouped with `target`, excluding itself
    fn group_members(&self, page: usize, target: &AnnotationRef) -> Vec<AnnotationRef>;

    fn translate_annotation(
        &mut self,
        page: usize,
        target: &AnnotationRef,
        dx: f32,
        dy: f32,
    ) -> EngineResult<()>;
}

/// Rendering layer notifications
pub trait RenderSink {
    /// Overlay-visible state (selection box, ink, eraser) of `page` changed
    fn invalidate_overlay(&mut self, page: usize);

    /// `page` settled and may be rendered at high resolution
    fn add_hq(&mut self, page: usize);

    /// `page` is moving again; drop its high-resolution render
    fn remove_hq(&mut self, page: usize);
}

/// Read-only preference snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub ink_thickness: f32,
    pub ink_color: Color,
    pub eraser_thickness: f32,
    /// Only stylus pointers draw; fingers keep panning
    pub use_stylus: bool,
    pub fit_width: bool,
    pub smart_text_selection: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ink_thickness: 3.0,
            ink_color: Color::BLACK,
            eraser_thickness: 10.0,
            use_stylus: false,
            fit_width: false,
            smart_text_selection: true,
        }
    }
}

/// Source of preference snapshots; the core never writes preferences
pub trait PreferencesSource {
    fn snapshot(&self) -> Preferences;
}

impl PreferencesSource for Preferences {
    fn snapshot(&self) -> Preferences {
        self.clone()
    }
}
