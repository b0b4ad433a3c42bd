//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Runtime overrides come from environment variables, see the `get_*` helpers.

/// Default sampling interval (milliseconds)
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 5_000;

/// Lower bound for the sampling interval. Shorter intervals are raised to this.
pub const MIN_MONITOR_INTERVAL_MS: u64 = 10;

/// Default capacity of the snapshot broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Consecutive high-confidence ticks before the threat level is boosted
pub const DEFAULT_CONSECUTIVE_BOOST_AFTER: u32 = 3;

/// Multiplier applied to the threat level once the streak is reached
pub const DEFAULT_CONSECUTIVE_BOOST_FACTOR: f32 = 1.2;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "countermeasure-core";

// ============================================
// Environment variable names
// ============================================

pub const ENV_MONITOR_INTERVAL_MS: &str = "THREAT_MONITOR_INTERVAL_MS";
pub const ENV_BROADCAST_CAPACITY: &str = "THREAT_BROADCAST_CAPACITY";
pub const ENV_NOTIFY_LEVEL_DELTA: &str = "THREAT_NOTIFY_LEVEL_DELTA";
pub const ENV_APPLY_COUNTERMEASURES: &str = "THREAT_APPLY_COUNTERMEASURES";
pub const ENV_ENGINE_CONFIG: &str = "THREAT_ENGINE_CONFIG";
pub const ENV_RUN_SECS: &str = "THREAT_RUN_SECS";

// ============================================
// Env value parsing
// ============================================
// Each parser returns None when the raw value is unusable, so callers can
// keep whatever value they already have instead of a compiled default.

/// Sampling interval in milliseconds
pub fn parse_monitor_interval_ms(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Broadcast capacity, must be non-zero
pub fn parse_broadcast_capacity(raw: &str) -> Option<usize> {
    raw.trim().parse().ok().filter(|c: &usize| *c > 0)
}

/// Material-change delta, must be finite and positive
pub fn parse_notify_level_delta(raw: &str) -> Option<f32> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// On/off switch: true/false, 1/0, yes/no, on/off (case-insensitive)
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Optional path to a JSON engine config file
pub fn get_engine_config_path() -> Option<std::path::PathBuf> {
    std::env::var(ENV_ENGINE_CONFIG).ok().map(std::path::PathBuf::from)
}

/// How long the diagnostic binary runs before exiting (None = until Ctrl-C)
pub fn get_run_secs() -> Option<u64> {
    std::env::var(ENV_RUN_SECS).ok().and_then(|s| s.trim().parse().ok())
}
