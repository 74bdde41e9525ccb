//! PDF Reader Core Library
//!
//! Document-space model for the reader's interaction layer: geometry,
//! annotation snapshots and selection, page text, hit-testing, the ink
//! drawing session and direct manipulation of text annotations, plus the
//! collaborator ports the reader talks to the document engine through.
//!
//! Nothing here knows about screen pixels except where a fixed on-screen
//! size (handles, slops) has to be converted with the current page scale.

pub mod annotation;
pub mod config;
pub mod content;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod ink;
pub mod manipulation;
pub mod ports;
pub mod text;

pub use annotation::{
    Annotation, AnnotationKind, AnnotationRef, ObjectId, Selection, SelectionKind, SidecarNote,
};
pub use config::GestureConfig;
pub use content::{ContentChanges, PageContent, PageContentSlots};
pub use error::{ConfigError, EngineError, EngineResult};
pub use geometry::{DocRect, DocSize, PageCoordinate, ScreenOffset, ScreenPoint, ScreenRect};
pub use hit_test::{
    ClickOutcome, Hit, HitContext, HitTestResolver, Link, LinkTarget, SelectionUpdate, Tap,
};
pub use ink::{DrawingSession, DrawingSnapshot, Stroke};
pub use manipulation::{
    clamp_and_normalize, handle_rect, hit_test_handle, HandleKind, HandleMetrics,
    ManipulationKind, PageFrame, PointerSample, RectCommit, Release, ScrollOutcome,
    TextAnnotationManipulator,
};
pub use ports::{
    AnnotationStyle, Color, ContentRequest, DocumentEngine, Preferences, PreferencesSource,
    RenderSink, SignatureState, WidgetAction, WidgetClick,
};
pub use text::{TextLine, TextSelection, TextWord};
