//! Store - 期限付きオブジェクトストア
//!
//! The store is the single source of truth for which keys exist and when
//! they expire. Bytes live in a [`ByteSink`]; the store only ever refers to
//! them through [`Location`]s.
//!
//! # 順序
//! - put: reserve key -> write staging -> commit -> publish
//! - purge / delete: claim entry -> delete bytes -> drop entry
//!
//! A key stays occupied from reservation until its bytes are gone, so a new
//! upload can never land on a location that a sweep is about to remove.
//! Only the task holding the claim deletes a location, and it only drops
//! the entry it claimed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncRead;

use crate::domain::{
    ObjectHandle, ObjectInfo, StorageKey, StoreError, StoredObject, TtlPolicy, sanitize_or_else,
};
use crate::observability::StoreStats;
use crate::ports::{ByteSink, Clock, IdGenerator, Location};

/// Lifecycle of a map entry.
///
/// Only `Live` entries that have not reached `expires_at` are visible.
#[derive(Debug, Clone)]
enum Entry {
    /// Key reserved, bytes still being written.
    Pending { staging: Location },

    /// Published object.
    Live(StoredObject),

    /// Invisible, bytes still present. The next sweep retries.
    Doomed { location: Location },

    /// A delete or sweep owns this entry and is removing its bytes.
    Reclaiming { location: Location },
}

pub(crate) struct StoreInner {
    entries: Mutex<HashMap<StorageKey, Entry>>,
    sink: Arc<dyn ByteSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    ttl: TtlPolicy,
}

impl StoreInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<StorageKey, Entry>> {
        // Every critical section leaves the map consistent, so a panic in
        // another holder does not invalidate it.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Expiring object store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub(crate) fn from_parts(
        sink: Arc<dyn ByteSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(HashMap::new()),
                sink,
                clock,
                ids,
                ttl,
            }),
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        self.inner.ttl
    }

    /// Store an upload.
    ///
    /// `raw_name` goes through the sanitizer (falling back to a generated
    /// name); a taken key is disambiguated as `name-1.ext`, `name-2.ext`, ...
    /// The object becomes visible only after its bytes are committed. On
    /// failure, or if this future is dropped mid-upload, nothing stays
    /// registered.
    pub async fn put<R>(
        &self,
        raw_name: &str,
        body: &mut R,
        requested_ttl_minutes: Option<i64>,
    ) -> Result<ObjectInfo, StoreError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let base = sanitize_or_else(raw_name, || self.inner.ids.generate_name());
        let lifetime = self.inner.ttl.lifetime(requested_ttl_minutes);
        let staging = Location::staging(self.inner.ids.generate_id());
        let reservation = self.reserve(base, staging.clone());
        let key = reservation.key.clone();
        let location = Location::for_key(&key);

        let size = match self.inner.sink.write(&staging, body).await {
            Ok(size) => size,
            Err(source) => {
                tracing::warn!(key = %key, error = %source, "upload write failed");
                return Err(StoreError::StorageWrite {
                    key: key.to_string(),
                    source,
                });
            }
        };

        if let Err(source) = self.inner.sink.commit(&staging, &location).await {
            tracing::warn!(key = %key, error = %source, "upload commit failed");
            return Err(StoreError::StorageWrite {
                key: key.to_string(),
                source,
            });
        }

        let created_at = self.inner.clock.now();
        let object = StoredObject {
            key: key.clone(),
            location,
            size,
            created_at,
            expires_at: created_at + lifetime,
        };
        let info = object.info();
        reservation.publish(object);

        tracing::info!(
            key = %info.key,
            size = info.size,
            expires_at = %info.expires_at,
            "object stored"
        );
        Ok(info)
    }

    /// Open a live object for reading.
    ///
    /// Unknown, expired and malformed keys all yield `NotFound`. Expiry is
    /// checked here, independent of whether a sweep has run. Reading does
    /// not extend the TTL.
    pub async fn get(&self, raw_key: &str) -> Result<ObjectHandle, StoreError> {
        let Ok(key) = StorageKey::parse(raw_key) else {
            tracing::debug!("download refused: malformed key");
            return Err(StoreError::NotFound);
        };

        let object = self.live_object(&key).ok_or(StoreError::NotFound)?;

        // A sweep may have removed the bytes since the lookup above.
        match self.inner.sink.open(&object.location).await {
            Ok(reader) => {
                tracing::debug!(key = %key, "object opened");
                Ok(ObjectHandle::new(object.info(), reader))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "object vanished before read");
                Err(StoreError::NotFound)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to open object");
                Err(StoreError::NotFound)
            }
        }
    }

    /// Live objects, sorted by key.
    pub fn list(&self) -> Vec<ObjectInfo> {
        let now = self.inner.clock.now();
        let mut infos: Vec<ObjectInfo> = self
            .inner
            .entries()
            .values()
            .filter_map(|entry| match entry {
                Entry::Live(object) if !object.is_expired_at(now) => Some(object.info()),
                _ => None,
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Remove a live object before its deadline.
    ///
    /// The object disappears from `get`/`list` immediately. If its bytes
    /// cannot be removed the entry is kept and the next sweep retries.
    pub async fn delete(&self, raw_key: &str) -> Result<(), StoreError> {
        let key = StorageKey::parse(raw_key).map_err(|_| StoreError::NotFound)?;
        let now = self.inner.clock.now();

        let claim = {
            let mut entries = self.inner.entries();
            let location = match entries.get(&key) {
                Some(Entry::Live(object)) if !object.is_expired_at(now) => object.location.clone(),
                _ => return Err(StoreError::NotFound),
            };
            Claim::take(&self.inner, &mut entries, key.clone(), location)
        };

        match self.inner.sink.delete(&claim.location).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "bytes already gone");
            }
            Err(source) => {
                tracing::warn!(key = %key, error = %source, "delete failed; sweep will retry");
                let location = claim.location.to_string();
                claim.release();
                return Err(StoreError::Deletion { location, source });
            }
        }

        claim.reclaimed();
        tracing::info!(key = %key, "object deleted");
        Ok(())
    }

    /// Reclaim every expired (or doomed) object. Returns how many were
    /// reclaimed.
    ///
    /// Per object: claim the entry, delete bytes, then drop the entry.
    /// Entries another delete or sweep is already reclaiming are skipped.
    /// Bytes that are already gone count as reclaimed. Any other failure is
    /// logged and the entry is left for the next sweep.
    pub async fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let claims: Vec<Claim> = {
            let mut entries = self.inner.entries();
            let candidates: Vec<(StorageKey, Location)> = entries
                .iter()
                .filter_map(|(key, entry)| match entry {
                    Entry::Live(object) if object.is_expired_at(now) => {
                        Some((key.clone(), object.location.clone()))
                    }
                    Entry::Doomed { location } => Some((key.clone(), location.clone())),
                    _ => None,
                })
                .collect();
            candidates
                .into_iter()
                .map(|(key, location)| Claim::take(&self.inner, &mut entries, key, location))
                .collect()
        };

        let mut reclaimed = 0;
        let mut failed = 0;
        for claim in claims {
            match self.inner.sink.delete(&claim.location).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(key = %claim.key, "expired object already gone");
                }
                Err(e) => {
                    tracing::warn!(
                        key = %claim.key,
                        location = %claim.location,
                        error = %e,
                        "failed to reclaim object"
                    );
                    claim.release();
                    failed += 1;
                    continue;
                }
            }
            claim.reclaimed();
            reclaimed += 1;
        }

        if reclaimed > 0 || failed > 0 {
            tracing::info!(reclaimed, failed, "sweep finished");
        } else {
            tracing::debug!("sweep finished: nothing expired");
        }
        reclaimed
    }

    /// Delete everything in the sink that the map does not account for:
    /// files left by a previous process and abandoned staging files.
    ///
    /// Meant to run once at startup, before uploads are accepted. Uploads in
    /// flight are still safe: a pending key's staging and final locations
    /// both count as tracked.
    pub async fn recover(&self) -> Result<usize, StoreError> {
        let stored = self.inner.sink.list().await.map_err(StoreError::Recovery)?;
        let tracked = self.tracked_locations();

        let mut removed = 0;
        for location in stored.into_iter().filter(|l| !tracked.contains(l)) {
            match self.inner.sink.delete(&location).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(location = %location, error = %e, "failed to remove orphan");
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "removed untracked files from upload root");
        }
        Ok(removed)
    }

    /// Snapshot of the map.
    pub fn stats(&self) -> StoreStats {
        let now = self.inner.clock.now();
        let mut stats = StoreStats::default();
        for entry in self.inner.entries().values() {
            match entry {
                Entry::Pending { .. } => stats.pending += 1,
                Entry::Live(object) if object.is_expired_at(now) => stats.expired_unreclaimed += 1,
                Entry::Live(object) => {
                    stats.live += 1;
                    stats.bytes_live += object.size;
                }
                Entry::Doomed { .. } | Entry::Reclaiming { .. } => stats.expired_unreclaimed += 1,
            }
        }
        stats
    }

    fn live_object(&self, key: &StorageKey) -> Option<StoredObject> {
        let now = self.inner.clock.now();
        match self.inner.entries().get(key) {
            Some(Entry::Live(object)) if !object.is_expired_at(now) => Some(object.clone()),
            _ => None,
        }
    }

    fn tracked_locations(&self) -> HashSet<Location> {
        let mut tracked = HashSet::new();
        for (key, entry) in self.inner.entries().iter() {
            match entry {
                // commit may already have moved the bytes to the final location
                Entry::Pending { staging } => {
                    tracked.insert(staging.clone());
                    tracked.insert(Location::for_key(key));
                }
                Entry::Live(object) => {
                    tracked.insert(object.location.clone());
                }
                Entry::Doomed { location } | Entry::Reclaiming { location } => {
                    tracked.insert(location.clone());
                }
            }
        }
        tracked
    }

    /// Claim the first free key among `base`, `base-1`, `base-2`, ...
    ///
    /// Any entry occupies its key, live or not: an expired object's bytes
    /// still sit at that location until the sweep removes them.
    fn reserve(&self, base: StorageKey, staging: Location) -> Reservation {
        let mut entries = self.inner.entries();
        let mut key = base.clone();
        let mut n = 0u32;
        while entries.contains_key(&key) {
            n += 1;
            key = base.with_suffix(n);
        }
        if n > 0 {
            tracing::debug!(requested = %base, assigned = %key, "name taken; disambiguated");
        }
        entries.insert(
            key.clone(),
            Entry::Pending {
                staging: staging.clone(),
            },
        );

        Reservation {
            inner: Arc::clone(&self.inner),
            key,
            staging,
            armed: true,
        }
    }
}

/// A pending key. Dropping it without publishing releases the key and
/// discards the staging bytes.
struct Reservation {
    inner: Arc<StoreInner>,
    key: StorageKey,
    staging: Location,
    armed: bool,
}

impl Reservation {
    fn publish(mut self, object: StoredObject) {
        self.inner.entries().insert(self.key.clone(), Entry::Live(object));
        self.armed = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        {
            let mut entries = self.inner.entries();
            if matches!(entries.get(&self.key), Some(Entry::Pending { .. })) {
                entries.remove(&self.key);
            }
        }

        // Staging bytes may or may not exist. Best effort; recover() catches
        // whatever is left.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let sink = Arc::clone(&self.inner.sink);
            let staging = self.staging.clone();
            handle.spawn(async move {
                let _ = sink.delete(&staging).await;
            });
        }
    }
}

/// Exclusive right to remove one entry's bytes.
///
/// Settles exactly once: `reclaimed` drops the entry, `release` (or drop,
/// e.g. a cancelled delete) hands it back as `Doomed` for the next sweep.
/// Either way only the entry this claim put in place is touched.
struct Claim {
    inner: Arc<StoreInner>,
    key: StorageKey,
    location: Location,
    armed: bool,
}

impl Claim {
    fn take(
        inner: &Arc<StoreInner>,
        entries: &mut HashMap<StorageKey, Entry>,
        key: StorageKey,
        location: Location,
    ) -> Self {
        entries.insert(
            key.clone(),
            Entry::Reclaiming {
                location: location.clone(),
            },
        );
        Self {
            inner: Arc::clone(inner),
            key,
            location,
            armed: true,
        }
    }

    fn reclaimed(mut self) {
        self.settle(true);
    }

    fn release(mut self) {
        self.settle(false);
    }

    fn settle(&mut self, bytes_gone: bool) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let mut entries = self.inner.entries();
        let ours = matches!(
            entries.get(&self.key),
            Some(Entry::Reclaiming { location }) if *location == self.location
        );
        if !ours {
            return;
        }
        if bytes_gone {
            entries.remove(&self.key);
        } else {
            entries.insert(
                self.key.clone(),
                Entry::Doomed {
                    location: self.location.clone(),
                },
            );
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.settle(false);
    }
}
