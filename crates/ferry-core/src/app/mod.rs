//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **StoreBuilder**: ストアの構築とワイヤリング
//! - **Store**: 期限付きオブジェクトストア（put / get / list / delete / purge）
//! - **GCLoop**: 期限切れオブジェクトの定期回収
//! - **Relay**: HTTP 層向けの upload / download 境界

pub mod builder;
pub mod gc_loop;
pub mod relay;
pub mod store;

pub use self::builder::StoreBuilder;
pub use self::gc_loop::GCLoop;
pub use self::relay::{Relay, UploadReceipt};
pub use self::store::Store;
