//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalFsSink**: アップロードディレクトリ（本番用）
//! - **InMemorySink**: 開発・テスト用

pub mod inmem_sink;
pub mod local_fs;

pub use self::inmem_sink::InMemorySink;
pub use self::local_fs::LocalFsSink;
