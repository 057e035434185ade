//! Ports - 抽象化レイヤー
//!
//! The store reaches its environment only through these traits: where
//! bytes live, what time it is, and how fresh names are made.

pub mod byte_sink;
pub mod clock;
pub mod id_generator;

pub use self::byte_sink::{ByteSink, Location, STAGING_PREFIX};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{GENERATED_NAME_PREFIX, IdGenerator, UlidGenerator};
