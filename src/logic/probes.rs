//! Probe Aggregation
//!
//! Anomaly probes are supplied by the embedding application. This module only
//! defines the probe interface and folds per-tick readings into a `ThreatAnalysis`.
//!
//! ## Structure
//! - `ThreatProbe`: one confidence source (hypervisor, timing, cache, ...)
//! - `ProbeSet`: at most one probe per kind, missing kinds read 0.0
//! - `ThreatAssessor`: weights, anomaly flags, consecutive-tick boost

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use super::error::ProbeError;
use super::threat::rules::clamp_unit;
use super::threat::{AnomalyFlags, ThreatAnalysis};
use crate::constants::{DEFAULT_CONSECUTIVE_BOOST_AFTER, DEFAULT_CONSECUTIVE_BOOST_FACTOR};

// ============================================================================
// PROBE INTERFACE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Hypervisor,
    Timing,
    Cache,
    PerfCounter,
    Memory,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 5] = [
        ProbeKind::Hypervisor,
        ProbeKind::Timing,
        ProbeKind::Cache,
        ProbeKind::PerfCounter,
        ProbeKind::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Hypervisor => "hypervisor",
            ProbeKind::Timing => "timing",
            ProbeKind::Cache => "cache",
            ProbeKind::PerfCounter => "perf_counter",
            ProbeKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A confidence source. Readings are in `[0, 1]`; anything else is clamped.
pub trait ThreatProbe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Bind to whatever the probe needs. `false` leaves the probe registered
    /// but it will read as benign.
    fn initialize(&self) -> bool {
        true
    }

    fn sample(&self) -> Result<f32, ProbeError>;
}

/// Probe with a fixed reading
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe {
    kind: ProbeKind,
    reading: f32,
}

impl StaticProbe {
    pub fn new(kind: ProbeKind, reading: f32) -> Self {
        Self { kind, reading }
    }

    /// Always reads zero confidence
    pub fn benign(kind: ProbeKind) -> Self {
        Self::new(kind, 0.0)
    }
}

impl ThreatProbe for StaticProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn sample(&self) -> Result<f32, ProbeError> {
        Ok(self.reading)
    }
}

/// Probe backed by a closure
pub struct FnProbe<F> {
    kind: ProbeKind,
    sample_fn: F,
}

impl<F> FnProbe<F>
where
    F: Fn() -> Result<f32, ProbeError> + Send + Sync,
{
    pub fn new(kind: ProbeKind, sample_fn: F) -> Self {
        Self { kind, sample_fn }
    }
}

impl<F> ThreatProbe for FnProbe<F>
where
    F: Fn() -> Result<f32, ProbeError> + Send + Sync,
{
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn sample(&self) -> Result<f32, ProbeError> {
        (self.sample_fn)()
    }
}

// ============================================================================
// PROBE SET
// ============================================================================

/// One tick's raw readings, already clamped. Missing kinds are 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProbeReadings {
    pub hypervisor: Option<f32>,
    pub timing: f32,
    pub cache: f32,
    pub perf_counter: f32,
    pub memory: f32,
}

impl ProbeReadings {
    fn set(&mut self, kind: ProbeKind, value: f32) {
        match kind {
            ProbeKind::Hypervisor => self.hypervisor = Some(value),
            ProbeKind::Timing => self.timing = value,
            ProbeKind::Cache => self.cache = value,
            ProbeKind::PerfCounter => self.perf_counter = value,
            ProbeKind::Memory => self.memory = value,
        }
    }
}

/// Outcome of sampling every probe once
#[derive(Debug, Clone, Default)]
pub struct SampleOutcome {
    pub readings: ProbeReadings,
    /// Probes that errored (or never initialized) and were read as 0.0
    pub failures: Vec<(ProbeKind, ProbeError)>,
}

struct ProbeSlot {
    probe: Arc<dyn ThreatProbe>,
    ready: bool,
}

#[derive(Default)]
pub struct ProbeSet {
    slots: BTreeMap<ProbeKind, ProbeSlot>,
}

impl ProbeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe. Returns the probe it replaced, if any.
    pub fn insert(&mut self, probe: Arc<dyn ThreatProbe>) -> Option<Arc<dyn ThreatProbe>> {
        let kind = probe.kind();
        self.slots
            .insert(kind, ProbeSlot { probe, ready: false })
            .map(|old| old.probe)
    }

    pub fn contains(&self, kind: ProbeKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn kinds(&self) -> Vec<ProbeKind> {
        self.slots.keys().copied().collect()
    }

    /// Initialize every probe. Returns the number that came up; the rest
    /// read as benign.
    pub fn initialize(&mut self) -> usize {
        let mut ready = 0;
        for (kind, slot) in self.slots.iter_mut() {
            slot.ready = slot.probe.initialize();
            if slot.ready {
                ready += 1;
            } else {
                log::warn!("Probe {} failed to initialize - reading as benign", kind);
            }
        }
        ready
    }

    pub fn sample(&self) -> SampleOutcome {
        let mut outcome = SampleOutcome::default();

        for (kind, slot) in &self.slots {
            let result = if slot.ready {
                panic::catch_unwind(AssertUnwindSafe(|| slot.probe.sample()))
                    .unwrap_or_else(|_| Err(ProbeError::Failed("probe panicked".to_string())))
            } else {
                Err(ProbeError::Unavailable("not initialized".to_string()))
            };

            match result {
                Ok(value) => outcome.readings.set(*kind, clamp_unit(value)),
                Err(e) => {
                    outcome.readings.set(*kind, 0.0);
                    outcome.failures.push((*kind, e));
                }
            }
        }

        outcome
    }
}

impl std::fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSet").field("kinds", &self.kinds()).finish()
    }
}

// ============================================================================
// ASSESSOR
// ============================================================================

pub const TIMING_FLAG_THRESHOLD: f32 = 0.4;
pub const CACHE_FLAG_THRESHOLD: f32 = 0.4;
pub const PERF_COUNTER_FLAG_THRESHOLD: f32 = 0.7;
pub const MEMORY_FLAG_THRESHOLD: f32 = 0.4;

pub const TIMING_WEIGHT: f32 = 0.30;
pub const CACHE_WEIGHT: f32 = 0.25;
pub const PERF_COUNTER_WEIGHT: f32 = 0.30;
pub const MEMORY_WEIGHT: f32 = 0.15;

/// Confidence above which a tick counts towards the boost streak
pub const BOOST_STREAK_CONFIDENCE: f32 = 0.5;

/// Folds probe readings into snapshots. Keeps the high-confidence streak
/// between ticks, so one assessor belongs to one engine.
#[derive(Debug, Clone)]
pub struct ThreatAssessor {
    boost_after: u32,
    boost_factor: f32,
    streak: u32,
}

impl Default for ThreatAssessor {
    fn default() -> Self {
        Self::new(DEFAULT_CONSECUTIVE_BOOST_AFTER, DEFAULT_CONSECUTIVE_BOOST_FACTOR)
    }
}

impl ThreatAssessor {
    pub fn new(boost_after: u32, boost_factor: f32) -> Self {
        Self {
            boost_after,
            boost_factor: if boost_factor.is_finite() && boost_factor > 0.0 {
                boost_factor
            } else {
                1.0
            },
            streak: 0,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn reset(&mut self) {
        self.streak = 0;
    }

    pub fn flags(readings: &ProbeReadings) -> AnomalyFlags {
        AnomalyFlags {
            timing: readings.timing > TIMING_FLAG_THRESHOLD,
            cache: readings.cache > CACHE_FLAG_THRESHOLD,
            perf_counter_blocked: readings.perf_counter > PERF_COUNTER_FLAG_THRESHOLD,
            memory: readings.memory > MEMORY_FLAG_THRESHOLD,
        }
    }

    pub fn weighted_confidence(readings: &ProbeReadings) -> f32 {
        clamp_unit(
            readings.timing * TIMING_WEIGHT
                + readings.cache * CACHE_WEIGHT
                + readings.perf_counter * PERF_COUNTER_WEIGHT
                + readings.memory * MEMORY_WEIGHT,
        )
    }

    pub fn assess(&mut self, readings: &ProbeReadings, timestamp_ms: u64) -> ThreatAnalysis {
        let flags = Self::flags(readings);
        let confidence = readings
            .hypervisor
            .unwrap_or_else(|| Self::weighted_confidence(readings));

        if confidence > BOOST_STREAK_CONFIDENCE {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }

        let mut level = confidence;
        if self.boost_after > 0 && self.streak >= self.boost_after {
            level = (level * self.boost_factor).min(1.0);
        }

        ThreatAnalysis::new(level, confidence, flags, timestamp_ms)
    }
}

// ============================================================================
// TESTS
// ============================================================================
