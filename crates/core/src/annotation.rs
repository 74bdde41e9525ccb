//! Annotation snapshots and selection
//!
//! Annotations are owned by the document engine. This module only holds the
//! read-only snapshots the gesture layer needs (kind, bounds, stable id) and
//! the current selection, which must survive reloads of the annotation list.

use crate::geometry::DocRect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable object identifier assigned by the document engine
///
/// Survives reloads of a page's annotation list, unlike a positional index.
/// Only positive values identify a real object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Whether the id refers to a persisted object
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Annotation subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Text,
    FreeText,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Ink,
    Square,
    Circle,
    Line,
    Polygon,
    Stamp,
    Other,
}

impl AnnotationKind {
    /// Text and free-text annotations (movable text boxes)
    pub fn is_text(&self) -> bool {
        matches!(self, AnnotationKind::Text | AnnotationKind::FreeText)
    }

    /// Text markup over page content
    pub fn is_markup(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Highlight
                | AnnotationKind::Underline
                | AnnotationKind::Squiggly
                | AnnotationKind::StrikeOut
        )
    }
}

/// Read-only snapshot of an embedded annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub rect: DocRect,
    pub object_id: Option<ObjectId>,
    /// Position and size locked by the author
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub contents: Option<String>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, rect: DocRect) -> Self {
        Self {
            kind,
            rect,
            object_id: None,
            locked: false,
            contents: None,
        }
    }

    pub fn with_object_id(mut self, id: u64) -> Self {
        self.object_id = Some(ObjectId(id));
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    /// The stable id if the engine assigned a valid one
    pub fn stable_id(&self) -> Option<ObjectId> {
        self.object_id.filter(ObjectId::is_valid)
    }
}

/// A note stored outside the document's native annotation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarNote {
    pub id: String,
    pub bounds: DocRect,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub locked: bool,
}

impl SidecarNote {
    pub fn new(id: impl Into<String>, bounds: DocRect) -> Self {
        Self {
            id: id.into(),
            bounds,
            text: String::new(),
            locked: false,
        }
    }

    /// Create a note with a freshly generated id
    pub fn generate(bounds: DocRect) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), bounds)
    }

    pub fn has_usable_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Address of an annotation for write-back through the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationRef {
    Embedded(ObjectId),
    Sidecar(String),
}

impl fmt::Display for AnnotationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationRef::Embedded(id) => write!(f, "embedded {}", id),
            AnnotationRef::Sidecar(id) => write!(f, "sidecar {:?}", id),
        }
    }
}

/// Which store the selected annotation lives in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionKind {
    /// Native annotation at `index` in the page's current annotation list
    Embedded {
        index: usize,
        object_id: Option<ObjectId>,
    },
    /// Sidecar note addressed by its string id
    Sidecar { id: String },
}

/// The single active annotation selection of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub kind: SelectionKind,
    pub annotation_kind: AnnotationKind,
    pub bounds: DocRect,
    pub locked: bool,
}

impl Selection {
    /// Select the embedded annotation at `index`
    pub fn embedded(index: usize, annotation: &Annotation) -> Self {
        Self {
            kind: SelectionKind::Embedded {
                index,
                object_id: annotation.stable_id(),
            },
            annotation_kind: annotation.kind,
            bounds: annotation.rect,
            locked: annotation.locked,
        }
    }

    /// Select a sidecar note
    pub fn sidecar(note: &SidecarNote) -> Self {
        Self {
            kind: SelectionKind::Sidecar {
                id: note.id.clone(),
            },
            annotation_kind: AnnotationKind::Text,
            bounds: note.bounds,
            locked: note.locked,
        }
    }

    /// Index into the embedded annotation list, if embedded
    pub fn embedded_index(&self) -> Option<usize> {
        match self.kind {
            SelectionKind::Embedded { index, .. } => Some(index),
            SelectionKind::Sidecar { .. } => None,
        }
    }

    /// Whether this selection is a text box the user can move or resize
    ///
    /// Embedded text annotations qualify only with a valid stable id; sidecar
    /// notes need a non-blank id.
    pub fn is_manipulable_text(&self) -> bool {
        match &self.kind {
            SelectionKind::Embedded { object_id, .. } => {
                self.annotation_kind.is_text() && object_id.is_some_and(|id| id.is_valid())
            }
            SelectionKind::Sidecar { id } => !id.trim().is_empty(),
        }
    }

    /// Whether the selection is a text or free-text annotation of either store
    pub fn is_text_annotation(&self) -> bool {
        match self.kind {
            SelectionKind::Embedded { .. } => self.annotation_kind.is_text(),
            SelectionKind::Sidecar { .. } => true,
        }
    }

    /// Write-back address, if the selection has a stable identity
    pub fn target(&self) -> Option<AnnotationRef> {
        match &self.kind {
            SelectionKind::Embedded { object_id, .. } => object_id
                .filter(ObjectId::is_valid)
                .map(AnnotationRef::Embedded),
            SelectionKind::Sidecar { id } if !id.trim().is_empty() => {
                Some(AnnotationRef::Sidecar(id.clone()))
            }
            SelectionKind::Sidecar { .. } => None,
        }
    }

    /// Re-resolve this selection against a reloaded annotation list
    ///
    /// Embedded selections are looked up by stable id (their index may have
    /// shifted); sidecar selections by note id. Returns `None` when the
    /// selected object no longer exists, or when an embedded selection never
    /// had a stable id to look up.
    pub fn reresolve(&self, annotations: &[Annotation], notes: &[SidecarNote]) -> Option<Selection> {
        match &self.kind {
            SelectionKind::Embedded { object_id, .. } => {
                let wanted = object_id.filter(ObjectId::is_valid)?;
                annotations
                    .iter()
                    .enumerate()
                    .find(|(_, annotation)| annotation.stable_id() == Some(wanted))
                    .map(|(index, annotation)| Selection::embedded(index, annotation))
            }
            SelectionKind::Sidecar { id } => notes
                .iter()
                .find(|note| &note.id == id)
                .map(Selection::sidecar),
        }
    }
}
