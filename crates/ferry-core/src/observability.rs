//! Logging setup and store counters.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Counts by entry state, for status endpoints and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Visible objects.
    pub live: usize,
    /// Uploads still being written.
    pub pending: usize,
    /// Past their deadline (or deleted) but bytes not yet reclaimed.
    pub expired_unreclaimed: usize,
    pub bytes_live: u64,
}

/// Install a `tracing` subscriber for a binary.
///
/// `RUST_LOG` wins; otherwise `default_directive` (e.g. `"info"`) applies.
/// Libraries never call this.
pub fn init_logging(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
