//! Response Types

use serde::{Deserialize, Serialize};

use crate::logic::threat::ThreatCategory;

// ============================================================================
// PLAN
// ============================================================================

/// Concrete countermeasure settings derived from one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountermeasurePlan {
    pub category: ThreatCategory,
    /// Timing-noise intensity, 0-100
    pub timing_noise_percent: u32,
    /// Decoy memory to allocate (MB), `None` when memory protection is off
    pub decoy_memory_mb: Option<u32>,
    /// Cache poisoning intensity (10-100), `None` when the gate is off
    pub cache_poison_intensity: Option<u32>,
    /// Share of available RAM to fill, `None` below NUCLEAR
    pub fill_ram_percent: Option<u32>,
    pub network_obfuscation: bool,
    pub decoy_ratio: u32,
}

// ============================================================================
// STEPS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountermeasureStep {
    TimingNoise,
    DecoyPatterns,
    CachePoisoning,
    FillRam,
    NetworkObfuscation,
}

impl CountermeasureStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountermeasureStep::TimingNoise => "timing_noise",
            CountermeasureStep::DecoyPatterns => "decoy_patterns",
            CountermeasureStep::CachePoisoning => "cache_poisoning",
            CountermeasureStep::FillRam => "fill_ram",
            CountermeasureStep::NetworkObfuscation => "network_obfuscation",
        }
    }
}

impl std::fmt::Display for CountermeasureStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Applied,
    Skipped,
    Unsupported,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Applied => "applied",
            StepStatus::Skipped => "skipped",
            StepStatus::Unsupported => "unsupported",
            StepStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: CountermeasureStep,
    pub status: StepStatus,
    pub message: Option<String>,
}

/// What happened when a plan was pushed through an actuator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub steps: Vec<StepResult>,
}

impl ApplyReport {
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn applied(&self) -> usize {
        self.count(StepStatus::Applied)
    }

    pub fn failed(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    pub fn status_of(&self, step: CountermeasureStep) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.status)
    }
}
