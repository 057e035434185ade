//! Stored objects and what callers get back for them.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::key::StorageKey;
use crate::ports::Location;

/// Byte stream handed out by a sink.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// A tracked upload. Immutable once published.
///
/// `expires_at > created_at` always holds: the TTL policy never yields
/// less than one minute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: StorageKey,
    pub location: Location,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredObject {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn info(&self) -> ObjectInfo {
        ObjectInfo {
            key: self.key.clone(),
            size: self.size,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Public view of an object (no storage location).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: StorageKey,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ObjectInfo {
    /// Lifetime the object was stored with, in whole minutes.
    pub fn ttl_minutes(&self) -> u32 {
        u32::try_from((self.expires_at - self.created_at).num_minutes()).unwrap_or(0)
    }
}

/// An open download.
///
/// Reading does not touch the object's TTL. The handle is itself an
/// `AsyncRead`, so it can be fed straight into a response body.
pub struct ObjectHandle {
    info: ObjectInfo,
    reader: ByteReader,
}

impl ObjectHandle {
    pub fn new(info: ObjectInfo, reader: ByteReader) -> Self {
        Self { info, reader }
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn into_reader(self) -> ByteReader {
        self.reader
    }

    /// Read the whole object into memory.
    pub async fn read_all(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.info.size as usize);
        self.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for ObjectHandle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn object() -> StoredObject {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let key = StorageKey::parse("a.txt").unwrap();
        StoredObject {
            location: Location::for_key(&key),
            key,
            size: 3,
            created_at,
            expires_at: created_at + TimeDelta::minutes(5),
        }
    }

    #[test]
    fn expires_exactly_at_deadline() {
        let obj = object();
        assert!(!obj.is_expired_at(obj.expires_at - TimeDelta::seconds(1)));
        assert!(obj.is_expired_at(obj.expires_at));
    }

    #[test]
    fn info_reports_stored_lifetime() {
        assert_eq!(object().info().ttl_minutes(), 5);
    }

    #[test]
    fn info_serializes_key_as_string() {
        let json = serde_json::to_value(object().info()).unwrap();
        assert_eq!(json["key"], "a.txt");
        assert_eq!(json["size"], 3);
    }

    #[tokio::test]
    async fn handle_reads_all_bytes() {
        let reader: ByteReader = Box::new(std::io::Cursor::new(b"abc".to_vec()));
        let handle = ObjectHandle::new(object().info(), reader);
        assert_eq!(handle.info().key.as_str(), "a.txt");
        assert_eq!(handle.read_all().await.unwrap(), b"abc");
    }
}
