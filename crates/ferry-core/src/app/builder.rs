//! StoreBuilder - ストアの構築とワイヤリング
//!
//! Fail-fast: an inconsistent TTL policy is rejected at build time instead
//! of surfacing as odd lifetimes later.

use std::sync::Arc;

use crate::config::{ConfigError, StoreConfig};
use crate::domain::TtlPolicy;
use crate::impls::LocalFsSink;
use crate::ports::{ByteSink, Clock, IdGenerator, SystemClock, UlidGenerator};

use super::store::Store;

/// StoreBuilder は Store を構築
///
/// # 使用例
/// ```ignore
/// let store = StoreBuilder::new(Arc::new(LocalFsSink::create("uploads").await?))
///     .ttl_policy(TtlPolicy::new(5, 20))
///     .build()?;
/// ```
///
/// Defaults: [`SystemClock`], a [`UlidGenerator`] driven by the chosen
/// clock, and [`TtlPolicy::default`].
pub struct StoreBuilder {
    sink: Arc<dyn ByteSink>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    ttl: TtlPolicy,
}

impl StoreBuilder {
    pub fn new(sink: Arc<dyn ByteSink>) -> Self {
        Self {
            sink,
            clock: None,
            ids: None,
            ttl: TtlPolicy::default(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(self) -> Result<Store, ConfigError> {
        if !self.ttl.is_valid() {
            return Err(ConfigError::InvalidTtl {
                default_minutes: self.ttl.default_minutes,
                max_minutes: self.ttl.max_minutes,
            });
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(Store::from_parts(self.sink, clock, ids, self.ttl))
    }
}

impl Store {
    /// A store over the local upload root described by `config`.
    pub async fn open(config: &StoreConfig) -> Result<Store, ConfigError> {
        config.validate()?;
        let sink = LocalFsSink::create(&config.upload_root)
            .await
            .map_err(|source| ConfigError::UploadRoot {
                path: config.upload_root.clone(),
                source,
            })?;
        StoreBuilder::new(Arc::new(sink))
            .ttl_policy(config.ttl_policy())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemorySink;

    #[test]
    fn build_with_defaults() {
        let store = StoreBuilder::new(Arc::new(InMemorySink::new())).build();
        let store = store.unwrap();
        assert_eq!(store.ttl_policy(), TtlPolicy::default());
    }

    #[test]
    fn build_rejects_inverted_ttl() {
        let store = StoreBuilder::new(Arc::new(InMemorySink::new()))
            .ttl_policy(TtlPolicy::new(30, 20))
            .build();
        assert!(matches!(
            store,
            Err(ConfigError::InvalidTtl { default_minutes: 30, max_minutes: 20 })
        ));
    }

    #[tokio::test]
    async fn open_creates_upload_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::default().with_upload_root(dir.path().join("uploads"));

        let store = Store::open(&config).await.unwrap();

        assert!(dir.path().join("uploads").is_dir());
        assert_eq!(store.ttl_policy(), config.ttl_policy());
    }
}
