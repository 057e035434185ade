//! InMemorySink - 開発・テスト用のバイト列ストア
//!
//! Failures can be switched on to exercise the store's error paths.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::ByteReader;
use crate::ports::{ByteSink, Location};

#[derive(Debug, Default)]
pub struct InMemorySink {
    objects: Mutex<BTreeMap<Location, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` fail (disk full, permission denied...).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` fail with a non-`NotFound` error.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.objects().contains_key(location)
    }

    /// Drop bytes behind the store's back.
    pub fn remove(&self, location: &Location) -> Option<Vec<u8>> {
        self.objects().remove(location)
    }

    /// Place bytes behind the store's back.
    pub fn insert(&self, location: Location, bytes: impl Into<Vec<u8>>) {
        self.objects().insert(location, bytes.into());
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<Location, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ByteSink for InMemorySink {
    async fn write(
        &self,
        location: &Location,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> io::Result<u64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                "injected write failure",
            ));
        }
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes).await?;
        let written = bytes.len() as u64;
        self.objects().insert(location.clone(), bytes);
        Ok(written)
    }

    async fn commit(&self, from: &Location, to: &Location) -> io::Result<()> {
        let mut objects = self.objects();
        let bytes = objects
            .remove(from)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        objects.insert(to.clone(), bytes);
        Ok(())
    }

    async fn open(&self, location: &Location) -> io::Result<ByteReader> {
        let bytes = self
            .objects()
            .get(location)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }

    async fn delete(&self, location: &Location) -> io::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected delete failure",
            ));
        }
        self.objects()
            .remove(location)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    async fn list(&self) -> io::Result<Vec<Location>> {
        Ok(self.objects().keys().cloned().collect())
    }
}
