//! Domain model: keys, sanitizing, TTL policy, objects, errors.

pub mod errors;
pub mod key;
pub mod object;
pub mod sanitize;
pub mod ttl;

pub use self::errors::StoreError;
pub use self::key::StorageKey;
pub use self::object::{ByteReader, ObjectHandle, ObjectInfo, StoredObject};
pub use self::sanitize::{sanitize, sanitize_or_else};
pub use self::ttl::{TtlPolicy, parse_minutes};
