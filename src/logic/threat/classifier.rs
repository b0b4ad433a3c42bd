//! Threat Classifier
//!
//! Pure, stateless functions over a `ThreatAnalysis`.
//! Input: ThreatAnalysis (or a raw level)
//! Output: category, scaling values, countermeasure gates

use super::rules::{
    chaos_intensity_for, clamp_unit, decoy_ratio_for, keystroke_min_delay_us,
    CACHE_POISONING_MIN, CRITICAL_THRESHOLD, HIGH_THRESHOLD, KEYSTROKE_CHAOS_FACTOR_US,
    MEDIUM_THRESHOLD, MEMORY_PROTECTION_MIN, NETWORK_OBFUSCATION_MIN, NUCLEAR_THRESHOLD,
};
use super::types::{ClassificationResult, CountermeasureGates, ThreatAnalysis, ThreatCategory};

// ============================================================================
// CATEGORY
// ============================================================================

/// Map a threat level to its category. Boundary values belong to the higher category.
pub fn categorize(threat_level: f32) -> ThreatCategory {
    let level = clamp_unit(threat_level);

    if level >= NUCLEAR_THRESHOLD {
        ThreatCategory::Nuclear
    } else if level >= CRITICAL_THRESHOLD {
        ThreatCategory::Critical
    } else if level >= HIGH_THRESHOLD {
        ThreatCategory::High
    } else if level >= MEDIUM_THRESHOLD {
        ThreatCategory::Medium
    } else {
        ThreatCategory::Low
    }
}

// ============================================================================
// SCALING
// ============================================================================

pub fn chaos_intensity(category: ThreatCategory) -> u32 {
    chaos_intensity_for(category)
}

pub fn decoy_ratio(category: ThreatCategory) -> u32 {
    decoy_ratio_for(category)
}

/// Keystroke delay window `(min_us, max_us)`, or `None` when no delay applies.
pub fn keystroke_delay_bounds(category: ThreatCategory) -> Option<(u32, u32)> {
    keystroke_min_delay_us(category).map(|min_us| {
        let max_us = min_us + chaos_intensity(category) * KEYSTROKE_CHAOS_FACTOR_US;
        (min_us, max_us)
    })
}

/// Threat level as a rounded percentage (0-100)
pub fn threat_percentage(threat_level: f32) -> u8 {
    (clamp_unit(threat_level) * 100.0).round() as u8
}

/// Display label for UI consumers
pub fn category_label(category: ThreatCategory) -> &'static str {
    match category {
        ThreatCategory::Low => "Low",
        ThreatCategory::Medium => "Medium",
        ThreatCategory::High => "High",
        ThreatCategory::Critical => "Critical",
        ThreatCategory::Nuclear => "Nuclear",
    }
}

// ============================================================================
// GATES
// ============================================================================

pub fn should_enable_memory_protection(analysis: &ThreatAnalysis) -> bool {
    analysis.threat_category() >= MEMORY_PROTECTION_MIN
}

pub fn should_enable_cache_poisoning(analysis: &ThreatAnalysis) -> bool {
    analysis.threat_category() >= CACHE_POISONING_MIN && analysis.cache_anomaly_detected()
}

pub fn should_enable_network_obfuscation(analysis: &ThreatAnalysis) -> bool {
    analysis.threat_category() >= NETWORK_OBFUSCATION_MIN
}

pub fn gates(analysis: &ThreatAnalysis) -> CountermeasureGates {
    CountermeasureGates {
        memory_protection: should_enable_memory_protection(analysis),
        cache_poisoning: should_enable_cache_poisoning(analysis),
        network_obfuscation: should_enable_network_obfuscation(analysis),
    }
}

// ============================================================================
// FULL CLASSIFICATION
// ============================================================================

/// Classify a snapshot, collecting human-readable reasons for the posture.
pub fn classify(analysis: &ThreatAnalysis) -> ClassificationResult {
    let category = analysis.threat_category();
    let gates = gates(analysis);
    let mut reasons = Vec::new();

    reasons.push(format!(
        "Threat level {:.2} -> {}",
        analysis.threat_level(),
        category
    ));

    let anomalies = analysis.anomalies();
    if anomalies.timing {
        reasons.push("Timing anomaly detected".to_string());
    }
    if anomalies.cache {
        reasons.push("Cache anomaly detected".to_string());
    }
    if anomalies.perf_counter_blocked {
        reasons.push("Performance counters blocked".to_string());
    }
    if anomalies.memory {
        reasons.push("Memory anomaly detected".to_string());
    }

    if gates.memory_protection {
        reasons.push("Memory protection enabled".to_string());
    }
    if gates.cache_poisoning {
        reasons.push("Cache poisoning enabled".to_string());
    } else if anomalies.cache {
        reasons.push(format!("Cache anomaly ignored below {}", CACHE_POISONING_MIN));
    }
    if gates.network_obfuscation {
        reasons.push("Network obfuscation enabled".to_string());
    }

    ClassificationResult {
        category,
        chaos_intensity: chaos_intensity(category),
        decoy_ratio: decoy_ratio(category),
        gates,
        reasons,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::threat::types::AnomalyFlags;

    fn snapshot(level: f32, flags: AnomalyFlags) -> ThreatAnalysis {
        ThreatAnalysis::new(level, level, flags, 0)
    }

    #[test]
    fn test_low_threat() {
        let a = snapshot(0.10, AnomalyFlags::none());
        assert_eq!(a.threat_category(), ThreatCategory::Low);
        assert_eq!(a.chaos_intensity(), 10);
        assert_eq!(a.decoy_ratio(), 10);
        assert!(!a.should_enable_memory_protection());
    }

    #[test]
    fn test_medium_threat_with_timing_anomaly() {
        let flags = AnomalyFlags {
            timing: true,
            ..Default::default()
        };
        let a = ThreatAnalysis::new(0.50, 0.45, flags, 0);

        assert_eq!(a.threat_category(), ThreatCategory::Medium);
        assert_eq!(a.chaos_intensity(), 60);
        assert_eq!(a.decoy_ratio(), 30);
        assert!(a.should_enable_memory_protection());
        assert!(!a.should_enable_cache_poisoning());
        assert!(!a.should_enable_network_obfuscation());
    }

    #[test]
    fn test_high_threat_with_cache_anomaly() {
        let flags = AnomalyFlags {
            timing: true,
            cache: true,
            memory: true,
            ..Default::default()
        };
        let a = ThreatAnalysis::new(0.75, 0.70, flags, 0);

        assert_eq!(a.threat_category(), ThreatCategory::High);
        assert_eq!(a.chaos_intensity(), 100);
        assert_eq!(a.decoy_ratio(), 50);
        assert!(a.should_enable_memory_protection());
        assert!(a.should_enable_cache_poisoning());
        assert!(!a.should_enable_network_obfuscation());
    }

    #[test]
    fn test_critical_threat() {
        let a = ThreatAnalysis::new(0.90, 0.85, AnomalyFlags::all(), 0);
        assert_eq!(a.threat_category(), ThreatCategory::Critical);
        assert_eq!(a.chaos_intensity(), 150);
        assert_eq!(a.decoy_ratio(), 70);
        assert!(!a.should_enable_network_obfuscation());
    }

    #[test]
    fn test_nuclear_threat() {
        let a = snapshot(0.98, AnomalyFlags::none());
        assert_eq!(a.threat_category(), ThreatCategory::Nuclear);
        assert_eq!(a.chaos_intensity(), 200);
        assert_eq!(a.decoy_ratio(), 90);
        assert!(a.should_enable_network_obfuscation());
    }

    #[test]
    fn test_boundaries_belong_to_higher_category() {
        assert_eq!(categorize(0.0), ThreatCategory::Low);
        assert_eq!(categorize(0.3499), ThreatCategory::Low);
        assert_eq!(categorize(0.35), ThreatCategory::Medium);
        assert_eq!(categorize(0.65), ThreatCategory::High);
        assert_eq!(categorize(0.85), ThreatCategory::Critical);
        assert_eq!(categorize(0.95), ThreatCategory::Nuclear);
        assert_eq!(categorize(1.0), ThreatCategory::Nuclear);
    }

    #[test]
    fn test_categorize_clamps_out_of_range() {
        assert_eq!(categorize(-3.0), ThreatCategory::Low);
        assert_eq!(categorize(7.0), ThreatCategory::Nuclear);
        assert_eq!(categorize(f32::NAN), ThreatCategory::Low);
    }

    #[test]
    fn test_category_is_monotonic_in_level() {
        let mut previous = ThreatCategory::Low;
        for step in 0..=1000 {
            let category = categorize(step as f32 / 1000.0);
            assert!(category >= previous);
            previous = category;
        }
        assert_eq!(previous, ThreatCategory::Nuclear);
    }

    #[test]
    fn test_scaling_is_monotonic() {
        for pair in ThreatCategory::ALL.windows(2) {
            assert!(chaos_intensity(pair[0]) <= chaos_intensity(pair[1]));
            assert!(decoy_ratio(pair[0]) <= decoy_ratio(pair[1]));
        }
    }

    #[test]
    fn test_cache_poisoning_needs_flag() {
        let a = snapshot(0.99, AnomalyFlags::none());
        assert!(!a.should_enable_cache_poisoning());

        let flags = AnomalyFlags {
            cache: true,
            ..Default::default()
        };
        assert!(!snapshot(0.64, flags).should_enable_cache_poisoning());
        assert!(snapshot(0.65, flags).should_enable_cache_poisoning());
    }

    #[test]
    fn test_memory_protection_ignores_flags() {
        assert!(!snapshot(0.34, AnomalyFlags::all()).should_enable_memory_protection());
        assert!(snapshot(0.35, AnomalyFlags::none()).should_enable_memory_protection());
    }

    #[test]
    fn test_keystroke_delay_bounds() {
        assert_eq!(keystroke_delay_bounds(ThreatCategory::Low), None);
        assert_eq!(keystroke_delay_bounds(ThreatCategory::Medium), Some((0, 600)));
        assert_eq!(keystroke_delay_bounds(ThreatCategory::High), Some((100, 1_100)));
        assert_eq!(keystroke_delay_bounds(ThreatCategory::Critical), Some((500, 2_000)));
        assert_eq!(keystroke_delay_bounds(ThreatCategory::Nuclear), Some((1_000, 3_000)));
    }

    #[test]
    fn test_threat_percentage() {
        assert_eq!(threat_percentage(0.0), 0);
        assert_eq!(threat_percentage(0.426), 43);
        assert_eq!(threat_percentage(1.0), 100);
        assert_eq!(threat_percentage(2.0), 100);
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label(ThreatCategory::Critical), "Critical");
        assert_eq!(category_label(ThreatCategory::Low), "Low");
    }

    #[test]
    fn test_classify_reports_reasons() {
        let flags = AnomalyFlags {
            cache: true,
            ..Default::default()
        };
        let result = classify(&snapshot(0.50, flags));
        assert_eq!(result.category, ThreatCategory::Medium);
        assert!(result.gates.memory_protection);
        assert!(!result.gates.cache_poisoning);
        assert!(result.reasons.iter().any(|r| r.contains("ignored")));
    }
}
