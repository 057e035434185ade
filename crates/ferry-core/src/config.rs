//! Store configuration.
//!
//! Every knob has a default; `from_env` overrides them from `FERRY_*`
//! variables. Malformed values are errors, not silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TtlPolicy;
use crate::domain::ttl::{DEFAULT_TTL_MINUTES, MAX_TTL_MINUTES};

pub const ENV_UPLOAD_ROOT: &str = "FERRY_UPLOAD_ROOT";
pub const ENV_MAX_TTL_MINUTES: &str = "FERRY_MAX_TTL_MINUTES";
pub const ENV_DEFAULT_TTL_MINUTES: &str = "FERRY_DEFAULT_TTL_MINUTES";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "FERRY_SWEEP_INTERVAL_SECS";

pub const DEFAULT_UPLOAD_ROOT: &str = "uploads";
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("default ttl ({default_minutes} min) must be between 1 and the max ttl ({max_minutes} min)")]
    InvalidTtl {
        default_minutes: u32,
        max_minutes: u32,
    },

    #[error("sweep interval must be greater than zero")]
    InvalidSweepInterval,

    #[error("cannot prepare upload root {}: {source}", path.display())]
    UploadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding uploaded bytes. Created if missing.
    pub upload_root: PathBuf,
    pub max_ttl_minutes: u32,
    pub default_ttl_minutes: u32,
    /// How often expired objects are reclaimed.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from(DEFAULT_UPLOAD_ROOT),
            max_ttl_minutes: MAX_TTL_MINUTES,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `FERRY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root) = lookup(ENV_UPLOAD_ROOT).filter(|v| !v.trim().is_empty()) {
            config.upload_root = PathBuf::from(root);
        }
        if let Some(minutes) = parse_var(&lookup, ENV_MAX_TTL_MINUTES)? {
            config.max_ttl_minutes = minutes;
        }
        if let Some(minutes) = parse_var(&lookup, ENV_DEFAULT_TTL_MINUTES)? {
            config.default_ttl_minutes = minutes;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SWEEP_INTERVAL_SECS)? {
            config.sweep_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_upload_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.upload_root = root.into();
        self
    }

    pub fn with_ttl(mut self, default_minutes: u32, max_minutes: u32) -> Self {
        self.default_ttl_minutes = default_minutes;
        self.max_ttl_minutes = max_minutes;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(self.default_ttl_minutes, self.max_ttl_minutes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ttl_policy().is_valid() {
            return Err(ConfigError::InvalidTtl {
                default_minutes: self.default_ttl_minutes,
                max_minutes: self.max_ttl_minutes,
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_ttl_minutes, 20);
        assert_eq!(config.default_ttl_minutes, 5);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.upload_root, PathBuf::from("uploads"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_UPLOAD_ROOT, "/srv/ferry"),
            (ENV_MAX_TTL_MINUTES, "60"),
            (ENV_DEFAULT_TTL_MINUTES, " 10 "),
            (ENV_SWEEP_INTERVAL_SECS, "45"),
        ]))
        .unwrap();

        assert_eq!(config.upload_root, PathBuf::from("/srv/ferry"));
        assert_eq!(config.ttl_policy(), TtlPolicy::new(10, 60));
        assert_eq!(config.sweep_interval, Duration::from_secs(45));
    }

    #[test]
    fn malformed_value_is_an_error() {
        let err = StoreConfig::from_lookup(lookup(&[(ENV_MAX_TTL_MINUTES, "twenty")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: ENV_MAX_TTL_MINUTES, ref value } if value == "twenty"
        ));
    }

    #[test]
    fn inconsistent_ttl_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(ENV_DEFAULT_TTL_MINUTES, "30")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTtl { default_minutes: 30, max_minutes: 20 }));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let config = StoreConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSweepInterval)));
    }

    #[test]
    fn serializes_for_reporting() {
        let json = serde_json::to_value(StoreConfig::default().with_ttl(2, 10)).unwrap();
        assert_eq!(json["default_ttl_minutes"], 2);
        assert_eq!(json["max_ttl_minutes"], 10);
    }
}
