use std::path::PathBuf;

/// Errors surfaced by the persistent cache layer.
///
/// Per the cache's failure semantics: write failures are always
/// propagated, read failures on a missing or corrupt file are not —
/// callers get an empty store back instead (see [`crate::load_or_default`]).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to write cache file {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to rename temp file into place at {path}: {source}")]
    Rename { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to serialize cache contents: {0}")]
    Serialize(#[from] serde_json::Error),
}
