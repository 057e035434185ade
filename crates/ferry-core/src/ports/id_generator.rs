//! IdGenerator port - 名前の自動生成
//!
//! Used for uploads whose name sanitizes to nothing, and for staging
//! locations.
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use ulid::Ulid;

use crate::domain::StorageKey;
use crate::ports::Clock;

/// Prefix of generated object names.
pub const GENERATED_NAME_PREFIX: &str = "upload-";

/// IdGenerator はランダムな識別子を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の upload から同時に呼ばれる）
pub trait IdGenerator: Send + Sync {
    fn generate_id(&self) -> Ulid;

    /// A fresh object name, always a valid key.
    fn generate_name(&self) -> StorageKey {
        StorageKey::generated(GENERATED_NAME_PREFIX, self.generate_id())
    }
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を使えば timestamp 部分は決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_id(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generated_names_are_unique_keys() {
        let id_gen = UlidGenerator::new(SystemClock);

        let a = id_gen.generate_name();
        let b = id_gen.generate_name();

        assert_ne!(a, b);
        assert!(a.as_str().starts_with(GENERATED_NAME_PREFIX));
        assert!(StorageKey::parse(a.as_str()).is_ok());
    }

    #[test]
    fn timestamp_follows_clock() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_id();
        let id2 = id_gen.generate_id();

        // ランダム部分があるので ID は異なるが、timestamp は同じ
        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), id2.timestamp_ms());
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
