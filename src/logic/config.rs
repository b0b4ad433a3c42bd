//! Engine Configuration
//!
//! Defaults come from `constants`; a JSON file (`THREAT_ENGINE_CONFIG`) and
//! individual env vars override them, in that order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::constants::{
    self, DEFAULT_BROADCAST_CAPACITY, DEFAULT_CONSECUTIVE_BOOST_AFTER,
    DEFAULT_CONSECUTIVE_BOOST_FACTOR, DEFAULT_MONITOR_INTERVAL_MS, MIN_MONITOR_INTERVAL_MS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval used when `start_monitoring` is given none
    pub default_interval_ms: u64,

    /// Snapshots buffered per `subscribe()` receiver before it lags
    pub broadcast_capacity: usize,

    /// Also notify when the level moves by at least this much within a
    /// category. `None` = category changes only.
    pub notify_level_delta: Option<f32>,

    /// High-confidence ticks in a row before the level is boosted (0 = never)
    pub consecutive_boost_after: u32,

    pub consecutive_boost_factor: f32,

    /// Push each snapshot's plan through the attached actuator
    pub apply_countermeasures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            notify_level_delta: None,
            consecutive_boost_after: DEFAULT_CONSECUTIVE_BOOST_AFTER,
            consecutive_boost_factor: DEFAULT_CONSECUTIVE_BOOST_FACTOR,
            apply_countermeasures: true,
        }
    }
}

impl EngineConfig {
    /// Defaults with env var overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: EngineConfig = serde_json::from_str(&raw)?;
        Ok(config.normalized())
    }

    /// JSON file named by `THREAT_ENGINE_CONFIG` (if any), then env overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// `load` against an arbitrary variable source
    fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup(constants::ENV_ENGINE_CONFIG) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_overrides(lookup))
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply each variable that is set and parses. Unusable values are
    /// logged and leave the current value alone.
    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::{
            parse_broadcast_capacity, parse_flag, parse_monitor_interval_ms,
            parse_notify_level_delta, ENV_APPLY_COUNTERMEASURES, ENV_BROADCAST_CAPACITY,
            ENV_MONITOR_INTERVAL_MS, ENV_NOTIFY_LEVEL_DELTA,
        };

        if let Some(ms) = override_value(&lookup, ENV_MONITOR_INTERVAL_MS, parse_monitor_interval_ms) {
            self.default_interval_ms = ms;
        }
        if let Some(capacity) =
            override_value(&lookup, ENV_BROADCAST_CAPACITY, parse_broadcast_capacity)
        {
            self.broadcast_capacity = capacity;
        }
        if let Some(delta) = override_value(&lookup, ENV_NOTIFY_LEVEL_DELTA, parse_notify_level_delta)
        {
            self.notify_level_delta = Some(delta);
        }
        if let Some(enabled) = override_value(&lookup, ENV_APPLY_COUNTERMEASURES, parse_flag) {
            self.apply_countermeasures = enabled;
        }
        self.normalized()
    }

    /// Pull out-of-range values back to something the engine can run with
    pub fn normalized(mut self) -> Self {
        self.default_interval_ms = clamp_interval_ms(self.default_interval_ms);
        if self.broadcast_capacity == 0 {
            self.broadcast_capacity = DEFAULT_BROADCAST_CAPACITY;
        }
        self.notify_level_delta = self
            .notify_level_delta
            .filter(|d| d.is_finite() && *d > 0.0);
        if !self.consecutive_boost_factor.is_finite() || self.consecutive_boost_factor <= 0.0 {
            self.consecutive_boost_factor = DEFAULT_CONSECUTIVE_BOOST_FACTOR;
        }
        self
    }

    // Presets

    /// Fast sampling for tests and diagnostics
    pub fn fast() -> Self {
        Self {
            default_interval_ms: 50,
            ..Self::default()
        }
    }

    /// Observe only: never drive the actuator
    pub fn passive() -> Self {
        Self {
            apply_countermeasures: false,
            ..Self::default()
        }
    }
}

pub fn clamp_interval_ms(interval_ms: u64) -> u64 {
    interval_ms.max(MIN_MONITOR_INTERVAL_MS)
}

fn override_value<T, F>(lookup: &F, key: &str, parse: fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        log::warn!("Ignoring {}={:?}: not a usable value", key, raw);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_interval_ms, 5_000);
        assert_eq!(config.notify_level_delta, None);
        assert_eq!(config.consecutive_boost_after, 3);
        assert!(config.apply_countermeasures);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_interval_ms": 250, "notify_level_delta": 0.1}}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.default_interval_ms, 250);
        assert_eq!(config.notify_level_delta, Some(0.1));
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_file("/definitely/not/here.json"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_normalized() {
        let config = EngineConfig {
            default_interval_ms: 0,
            broadcast_capacity: 0,
            notify_level_delta: Some(-1.0),
            consecutive_boost_factor: f32::NAN,
            ..EngineConfig::default()
        }
        .normalized();

        assert_eq!(config.default_interval_ms, MIN_MONITOR_INTERVAL_MS);
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert_eq!(config.notify_level_delta, None);
        assert_eq!(config.consecutive_boost_factor, DEFAULT_CONSECUTIVE_BOOST_FACTOR);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_bad_env_values_keep_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_interval_ms": 250, "broadcast_capacity": 4}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = EngineConfig::load_with(vars(&[
            (constants::ENV_ENGINE_CONFIG, path.as_str()),
            (constants::ENV_MONITOR_INTERVAL_MS, "not-a-number"),
            (constants::ENV_BROADCAST_CAPACITY, "0"),
            (constants::ENV_APPLY_COUNTERMEASURES, "maybe"),
        ]))
        .unwrap();

        assert_eq!(config.default_interval_ms, 250);
        assert_eq!(config.broadcast_capacity, 4);
        assert!(config.apply_countermeasures);
    }

    #[test]
    fn test_good_env_values_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_interval_ms": 250, "broadcast_capacity": 4}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = EngineConfig::load_with(vars(&[
            (constants::ENV_ENGINE_CONFIG, path.as_str()),
            (constants::ENV_MONITOR_INTERVAL_MS, "750"),
            (constants::ENV_NOTIFY_LEVEL_DELTA, "0.2"),
            (constants::ENV_APPLY_COUNTERMEASURES, "off"),
        ]))
        .unwrap();

        assert_eq!(config.default_interval_ms, 750);
        assert_eq!(config.broadcast_capacity, 4);
        assert_eq!(config.notify_level_delta, Some(0.2));
        assert!(!config.apply_countermeasures);
    }

    #[test]
    fn test_no_vars_is_default() {
        assert_eq!(EngineConfig::load_with(vars(&[])).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_presets() {
        assert_eq!(EngineConfig::fast().default_interval_ms, 50);
        assert!(!EngineConfig::passive().apply_countermeasures);
    }
}
