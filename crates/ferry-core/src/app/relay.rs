//! Relay - HTTP 層との境界
//!
//! The HTTP layer calls exactly these two operations. It maps
//! `StorageWrite` to a retryable server error and `NotFound` to 404.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::domain::{ObjectHandle, StorageKey, StoreError};

use super::store::Store;

/// What the uploader gets back: the name to share and when it stops working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub key: StorageKey,
    pub expires_at: DateTime<Utc>,
    pub ttl_minutes: u32,
}

#[derive(Clone)]
pub struct Relay {
    store: Store,
}

impl Relay {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// `requested_ttl` is the raw form field, e.g. `Some("10")`.
    pub async fn handle_upload<R>(
        &self,
        raw_filename: &str,
        body: &mut R,
        requested_ttl: Option<&str>,
    ) -> Result<UploadReceipt, StoreError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let requested = requested_ttl.and_then(crate::domain::parse_minutes);
        let info = self.store.put(raw_filename, body, requested).await?;
        Ok(UploadReceipt {
            ttl_minutes: info.ttl_minutes(),
            key: info.key,
            expires_at: info.expires_at,
        })
    }

    pub async fn handle_download(&self, key: &str) -> Result<ObjectHandle, StoreError> {
        self.store.get(key).await
    }
}
