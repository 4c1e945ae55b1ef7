// src/error.rs
// =============================================================================
// Error type shared by every service in the crate.
//
// Collaborators (link index, content source) report failures as
// anyhow::Error; the services wrap them here so callers can tell a
// retryable storage failure apart from bad input or a cancelled job.
// =============================================================================

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be read as a URL string at all.
    #[error("invalid URL input: {0}")]
    InvalidUrl(String),

    /// The link index failed to load, create, update or delete records.
    #[error("link index operation failed: {0}")]
    Storage(#[source] anyhow::Error),

    /// The owning content could not be loaded.
    #[error("content source failed: {0}")]
    ContentSource(#[source] anyhow::Error),

    #[error("invalid settings: {0}")]
    Config(#[from] serde_json::Error),

    #[error("could not read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// A cancellable job was stopped before it finished.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Storage and content failures can be retried as-is; the batch cursor
    /// and the index are left where they were.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::ContentSource(_))
    }
}
