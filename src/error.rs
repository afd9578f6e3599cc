//! Error type for the library query engine.

use thiserror::Error;

/// Failures surfaced by [`crate::library::query::Library`].
///
/// The engine treats every filter input permissively, so the only failures are
/// backend ones. They are passed through untouched for the caller to map.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;
