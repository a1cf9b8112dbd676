//! Shared error types for the services crate.

use thiserror::Error;

use bite_core::model::{CatalogError, NoteError};
use storage::sqlite::SqliteInitError;

/// Errors emitted while loading the content list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("failed to read content list: {0}")]
    Io(#[from] std::io::Error),
    #[error("content list request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors emitted by `NoteService`.
///
/// Persistence failures are logged, not returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NoteServiceError {
    #[error(transparent)]
    Note(#[from] NoteError),
}

/// Errors emitted by the remote table configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteConfigError {
    #[error("invalid remote store URL: {0}")]
    InvalidUrl(String),
    #[error("remote store API key is empty")]
    EmptyKey,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
