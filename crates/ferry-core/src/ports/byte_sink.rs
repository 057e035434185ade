//! ByteSink port - バイト列の保存先（Local / InMemory）
//!
//! The store never touches paths itself. It hands the sink opaque
//! [`Location`]s and the sink decides where bytes physically live.

use std::fmt;
use std::io;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use ulid::Ulid;

use crate::domain::{ByteReader, StorageKey};

/// Prefix of in-progress uploads. Outside the key alphabet, so a staging
/// location can never collide with a key.
pub const STAGING_PREFIX: char = '~';

/// Where an object's bytes live, relative to the sink's root.
///
/// Always a single path component: either a [`StorageKey`] or a staging
/// name `~<ulid>.part`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location(String);

impl Location {
    /// Final location of a published object.
    pub fn for_key(key: &StorageKey) -> Self {
        Self(key.as_str().to_string())
    }

    /// Scratch location for an upload in progress.
    pub fn staging(id: Ulid) -> Self {
        Self(format!("{STAGING_PREFIX}{}.part", id.to_string().to_lowercase()))
    }

    /// A name found while listing the sink. Only the sink creates these.
    pub fn from_listing(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_staging(&self) -> bool {
        self.0.starts_with(STAGING_PREFIX)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ByteSink は upload のバイト列を保存
///
/// # 設計原則
/// - `write` は完全に書き終えてから `Ok` を返す（部分書き込みは Err）
/// - `commit` は staging -> final の置き換え（rename 相当）
/// - `open` / `delete` は存在しなければ `io::ErrorKind::NotFound`
#[async_trait]
pub trait ByteSink: Send + Sync {
    /// Drain `source` into `location`, returning the byte count.
    async fn write(
        &self,
        location: &Location,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<u64>;

    /// Move fully written bytes from `from` to `to`.
    async fn commit(&self, from: &Location, to: &Location) -> io::Result<()>;

    async fn open(&self, location: &Location) -> io::Result<ByteReader>;

    async fn delete(&self, location: &Location) -> io::Result<()>;

    /// Every location currently holding bytes.
    async fn list(&self) -> io::Result<Vec<Location>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_locations_are_not_keys() {
        let staging = Location::staging(Ulid::new());
        assert!(staging.is_staging());
        assert!(staging.as_str().ends_with(".part"));
        assert!(StorageKey::parse(staging.as_str()).is_err());
    }

    #[test]
    fn key_locations_mirror_the_key() {
        let key = StorageKey::parse("photo.png").unwrap();
        let location = Location::for_key(&key);
        assert_eq!(location.as_str(), "photo.png");
        assert!(!location.is_staging());
    }
}
