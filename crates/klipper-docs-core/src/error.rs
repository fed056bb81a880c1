//! Error types for the search and retrieval core.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A query arrived before any successful index build.
    #[error("search index is not ready: no index has been built yet")]
    IndexNotReady,

    /// Lookup by id found nothing. Core lookups return `Option`; callers
    /// at the protocol boundary convert absence into this variant.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Two documents in one snapshot derived the same identifier.
    #[error("duplicate document id '{id}' (from '{first}' and '{second}')")]
    DuplicateDocument {
        id: String,
        first: String,
        second: String,
    },
}
