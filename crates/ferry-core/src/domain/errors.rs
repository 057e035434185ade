//! Errors - ストアのエラー型
//!
//! `NotFound` is deliberately detail-free: unknown, expired and malformed
//! keys must look identical to a caller.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A name that is not a valid storage key.
    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    /// The byte sink refused the upload. Nothing was registered.
    #[error("failed to store object {key}: {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("object not found")]
    NotFound,

    /// Removing bytes failed. The entry stays tracked and is retried by the
    /// next sweep.
    #[error("failed to delete {location}: {source}")]
    Deletion {
        location: String,
        #[source]
        source: io::Error,
    },

    /// The upload root could not be scanned.
    #[error("failed to scan upload root: {0}")]
    Recovery(#[source] io::Error),
}

impl StoreError {
    /// Can the client usefully try again?
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StorageWrite { .. })
    }
}
