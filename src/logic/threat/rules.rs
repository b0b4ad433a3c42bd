//! Threat Classification Rules & Thresholds
//!
//! Every threshold used to bucket a threat level lives here. Consumers must go
//! through `classifier` instead of re-deriving their own ladders.
//! No classify logic here - only constants.

use super::types::ThreatCategory;

// ============================================================================
// CATEGORY BOUNDARIES (closed-open, by threat level)
// ============================================================================

/// At or above this level = Medium
pub const MEDIUM_THRESHOLD: f32 = 0.35;

/// At or above this level = High
pub const HIGH_THRESHOLD: f32 = 0.65;

/// At or above this level = Critical
pub const CRITICAL_THRESHOLD: f32 = 0.85;

/// At or above this level = Nuclear
pub const NUCLEAR_THRESHOLD: f32 = 0.95;

// ============================================================================
// SCALING TABLES
// ============================================================================

/// Chaos intensity per category, used to scale randomized delay and jitter
pub const fn chaos_intensity_for(category: ThreatCategory) -> u32 {
    match category {
        ThreatCategory::Low => 10,
        ThreatCategory::Medium => 60,
        ThreatCategory::High => 100,
        ThreatCategory::Critical => 150,
        ThreatCategory::Nuclear => 200,
    }
}

/// Decoy-to-real percentage per category
pub const fn decoy_ratio_for(category: ThreatCategory) -> u32 {
    match category {
        ThreatCategory::Low => 10,
        ThreatCategory::Medium => 30,
        ThreatCategory::High => 50,
        ThreatCategory::Critical => 70,
        ThreatCategory::Nuclear => 90,
    }
}

/// Minimum keystroke delay (µs) per category. `None` = no keystroke delay.
pub const fn keystroke_min_delay_us(category: ThreatCategory) -> Option<u32> {
    match category {
        ThreatCategory::Low => None,
        ThreatCategory::Medium => Some(0),
        ThreatCategory::High => Some(100),
        ThreatCategory::Critical => Some(500),
        ThreatCategory::Nuclear => Some(1_000),
    }
}

/// Keystroke max delay = min delay + chaos intensity * this factor (µs)
pub const KEYSTROKE_CHAOS_FACTOR_US: u32 = 10;

// ============================================================================
// GATES
// ============================================================================

/// Lowest category with memory protection enabled
pub const MEMORY_PROTECTION_MIN: ThreatCategory = ThreatCategory::Medium;

/// Lowest category with cache poisoning enabled (also needs the cache anomaly flag)
pub const CACHE_POISONING_MIN: ThreatCategory = ThreatCategory::High;

/// Lowest category with network obfuscation enabled
pub const NETWORK_OBFUSCATION_MIN: ThreatCategory = ThreatCategory::Nuclear;

// ============================================================================
// HELPERS
// ============================================================================

/// Clamp to `[0, 1]`, mapping NaN to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_ordered() {
        assert!(MEDIUM_THRESHOLD < HIGH_THRESHOLD);
        assert!(HIGH_THRESHOLD < CRITICAL_THRESHOLD);
        assert!(CRITICAL_THRESHOLD < NUCLEAR_THRESHOLD);
        assert!(NUCLEAR_THRESHOLD <= 1.0);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_tables_strictly_increase() {
        for pair in ThreatCategory::ALL.windows(2) {
            assert!(chaos_intensity_for(pair[0]) < chaos_intensity_for(pair[1]));
            assert!(decoy_ratio_for(pair[0]) < decoy_ratio_for(pair[1]));
        }
    }
}
