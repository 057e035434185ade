//! ferry-core
//!
//! Expiring object storage for a small file relay: uploads get a safe,
//! unique key and a bounded lifetime, and are reclaimed once it runs out.
//!
//! # モジュール構成
//! - **domain**: キー、サニタイズ、TTL ポリシー、オブジェクト、エラー
//! - **ports**: 抽象化レイヤー（ByteSink, Clock, IdGenerator）
//! - **impls**: ports の実装（LocalFsSink, InMemorySink）
//! - **app**: Store, GCLoop, Relay（HTTP 層との境界）
//! - **config**: StoreConfig（環境変数から読み込み）
//! - **observability**: ログ初期化とカウンタ

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{GCLoop, Relay, Store, StoreBuilder, UploadReceipt};
pub use config::{ConfigError, StoreConfig};
pub use domain::{ObjectHandle, ObjectInfo, StorageKey, StoreError, TtlPolicy, sanitize};
