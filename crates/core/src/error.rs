//! Error types shared by the reader core
//!
//! Only collaborator failures and configuration problems are errors. Content
//! that is not loaded yet, stale selections and degenerate geometry are
//! normal outcomes and are modelled as `Option`/no-op results instead.

use crate::annotation::ObjectId;

/// Failure reported by the document engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("annotation {0} not found")]
    AnnotationNotFound(ObjectId),

    #[error("sidecar note {0:?} not found")]
    SidecarNoteNotFound(String),

    #[error("page content is not loaded yet")]
    ContentNotReady,

    #[error("engine rejected the request: {0}")]
    Rejected(String),
}

/// Result type for document engine calls
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while loading gesture configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for configuration key {key}")]
    InvalidValue { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
