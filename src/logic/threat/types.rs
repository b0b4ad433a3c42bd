//! Threat Types
//!
//! Core types for threat classification.
//! No decision logic here - derived values delegate to `classifier`.

use serde::{Deserialize, Serialize};

use super::classifier;
use super::rules::clamp_unit;

// ============================================================================
// THREAT CATEGORY
// ============================================================================

/// Discrete severity bucket derived from a continuous threat level.
///
/// Ordered `Low < Medium < High < Critical < Nuclear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatCategory {
    Low,
    Medium,
    High,
    Critical,
    Nuclear,
}

impl ThreatCategory {
    /// Every category, lowest first
    pub const ALL: [ThreatCategory; 5] = [
        ThreatCategory::Low,
        ThreatCategory::Medium,
        ThreatCategory::High,
        ThreatCategory::Critical,
        ThreatCategory::Nuclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::Low => "LOW",
            ThreatCategory::Medium => "MEDIUM",
            ThreatCategory::High => "HIGH",
            ThreatCategory::Critical => "CRITICAL",
            ThreatCategory::Nuclear => "NUCLEAR",
        }
    }

    pub fn severity_level(&self) -> u8 {
        match self {
            ThreatCategory::Low => 0,
            ThreatCategory::Medium => 1,
            ThreatCategory::High => 2,
            ThreatCategory::Critical => 3,
            ThreatCategory::Nuclear => 4,
        }
    }

    pub fn is_elevated(&self) -> bool {
        *self != ThreatCategory::Low
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ANOMALY FLAGS
// ============================================================================

/// Independent boolean anomaly signals reported for one sampling tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyFlags {
    pub timing: bool,
    pub cache: bool,
    pub perf_counter_blocked: bool,
    pub memory: bool,
}

impl AnomalyFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            timing: true,
            cache: true,
            perf_counter_blocked: true,
            memory: true,
        }
    }

    pub fn count(&self) -> usize {
        [self.timing, self.cache, self.perf_counter_blocked, self.memory]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

// ============================================================================
// THREAT ANALYSIS (immutable snapshot)
// ============================================================================

/// One sampling tick's view of the environment.
///
/// Created once per tick, never mutated. `threat_level` and
/// `hypervisor_confidence` are clamped to `[0, 1]` on construction
/// (NaN reads as 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThreatAnalysis {
    threat_level: f32,
    hypervisor_confidence: f32,
    anomalies: AnomalyFlags,
    /// Monotonic milliseconds since the producing engine started
    analysis_timestamp: u64,
}

impl ThreatAnalysis {
    pub fn new(
        threat_level: f32,
        hypervisor_confidence: f32,
        anomalies: AnomalyFlags,
        analysis_timestamp: u64,
    ) -> Self {
        Self {
            threat_level: clamp_unit(threat_level),
            hypervisor_confidence: clamp_unit(hypervisor_confidence),
            anomalies,
            analysis_timestamp,
        }
    }

    /// Snapshot with no anomalies, confidence equal to the level
    pub fn from_level(threat_level: f32, analysis_timestamp: u64) -> Self {
        Self::new(threat_level, threat_level, AnomalyFlags::none(), analysis_timestamp)
    }

    pub fn threat_level(&self) -> f32 {
        self.threat_level
    }

    pub fn hypervisor_confidence(&self) -> f32 {
        self.hypervisor_confidence
    }

    pub fn anomalies(&self) -> AnomalyFlags {
        self.anomalies
    }

    pub fn timing_anomaly_detected(&self) -> bool {
        self.anomalies.timing
    }

    pub fn cache_anomaly_detected(&self) -> bool {
        self.anomalies.cache
    }

    pub fn perf_counter_blocked(&self) -> bool {
        self.anomalies.perf_counter_blocked
    }

    pub fn memory_anomaly_detected(&self) -> bool {
        self.anomalies.memory
    }

    pub fn analysis_timestamp(&self) -> u64 {
        self.analysis_timestamp
    }

    // ---- derived accessors ------------------------------------------------

    pub fn threat_category(&self) -> ThreatCategory {
        classifier::categorize(self.threat_level)
    }

    pub fn chaos_intensity(&self) -> u32 {
        classifier::chaos_intensity(self.threat_category())
    }

    pub fn decoy_ratio(&self) -> u32 {
        classifier::decoy_ratio(self.threat_category())
    }

    pub fn should_enable_memory_protection(&self) -> bool {
        classifier::should_enable_memory_protection(self)
    }

    pub fn should_enable_cache_poisoning(&self) -> bool {
        classifier::should_enable_cache_poisoning(self)
    }

    pub fn should_enable_network_obfuscation(&self) -> bool {
        classifier::should_enable_network_obfuscation(self)
    }

    /// Threat level as a rounded percentage (0-100)
    pub fn threat_percentage(&self) -> u8 {
        classifier::threat_percentage(self.threat_level)
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// Countermeasure gates for one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountermeasureGates {
    pub memory_protection: bool,
    pub cache_poisoning: bool,
    pub network_obfuscation: bool,
}

/// Everything a consumer needs to decide its posture for one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub category: ThreatCategory,
    pub chaos_intensity: u32,
    pub decoy_ratio: u32,
    pub gates: CountermeasureGates,
    pub reasons: Vec<String>,
}
