//! Countermeasure Plan
//!
//! Turns a snapshot into concrete settings and pushes them through the
//! embedding application's actuator. Every step runs even if an earlier one
//! fails.

use crate::logic::error::ActuatorError;
use crate::logic::threat::{ThreatAnalysis, ThreatCategory};

use super::types::{
    ApplyReport, CountermeasurePlan, CountermeasureStep, StepResult, StepStatus,
};

/// Share of available RAM filled at NUCLEAR
pub const NUCLEAR_FILL_RAM_PERCENT: u32 = 30;

/// Cache poisoning intensity is `chaos / 2` clamped to this range
pub const CACHE_POISON_MIN_INTENSITY: u32 = 10;
pub const CACHE_POISON_MAX_INTENSITY: u32 = 100;

/// Decoy memory (MB) allocated while memory protection is on
pub fn decoy_memory_mb(category: ThreatCategory) -> Option<u32> {
    match category {
        ThreatCategory::Low => None,
        ThreatCategory::Medium => Some(10),
        ThreatCategory::High => Some(25),
        ThreatCategory::Critical => Some(50),
        ThreatCategory::Nuclear => Some(100),
    }
}

impl CountermeasurePlan {
    pub fn from_analysis(analysis: &ThreatAnalysis) -> Self {
        let category = analysis.threat_category();
        let half_chaos = analysis.chaos_intensity() / 2;

        let decoy_memory_mb = if analysis.should_enable_memory_protection() {
            decoy_memory_mb(category)
        } else {
            None
        };

        let cache_poison_intensity = if analysis.should_enable_cache_poisoning() {
            Some(half_chaos.clamp(CACHE_POISON_MIN_INTENSITY, CACHE_POISON_MAX_INTENSITY))
        } else {
            None
        };

        let fill_ram_percent = if category == ThreatCategory::Nuclear {
            Some(NUCLEAR_FILL_RAM_PERCENT)
        } else {
            None
        };

        Self {
            category,
            timing_noise_percent: half_chaos.min(100),
            decoy_memory_mb,
            cache_poison_intensity,
            fill_ram_percent,
            network_obfuscation: analysis.should_enable_network_obfuscation(),
            decoy_ratio: analysis.decoy_ratio(),
        }
    }
}

// ============================================================================
// ACTUATOR
// ============================================================================

/// Native side of the countermeasures (memory scrambler, cache operations,
/// network layer). Every operation defaults to a no-op.
pub trait CountermeasureActuator: Send + Sync {
    fn add_timing_noise(&self, _intensity_percent: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn create_decoy_patterns(&self, _size_mb: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn poison_cache(&self, _intensity: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn fill_available_ram(&self, _fill_percent: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn set_network_obfuscation(&self, _enabled: bool) -> Result<(), ActuatorError> {
        Ok(())
    }
}

/// Actuator that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActuator;

impl CountermeasureActuator for NoopActuator {}

/// Actuator that routes timing noise to the in-process `timing` primitive
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingNoiseActuator;

impl CountermeasureActuator for TimingNoiseActuator {
    fn add_timing_noise(&self, intensity_percent: u32) -> Result<(), ActuatorError> {
        crate::logic::timing::add_timing_noise(intensity_percent)
            .map_err(|e| ActuatorError::Failed(e.to_string()))
    }
}

fn record(report: &mut ApplyReport, step: CountermeasureStep, result: Option<Result<(), ActuatorError>>) {
    let (status, message) = match result {
        None => (StepStatus::Skipped, None),
        Some(Ok(())) => (StepStatus::Applied, None),
        Some(Err(ActuatorError::Unsupported(what))) => {
            (StepStatus::Unsupported, Some(what.to_string()))
        }
        Some(Err(e)) => {
            log::warn!("Countermeasure {} failed: {}", step, e);
            (StepStatus::Failed, Some(e.to_string()))
        }
    };

    report.steps.push(StepResult {
        step,
        status,
        message,
    });
}

pub fn apply_plan(plan: &CountermeasurePlan, actuator: &dyn CountermeasureActuator) -> ApplyReport {
    let mut report = ApplyReport::default();

    let noise = (plan.timing_noise_percent > 0)
        .then(|| actuator.add_timing_noise(plan.timing_noise_percent));
    record(&mut report, CountermeasureStep::TimingNoise, noise);

    let decoys = plan.decoy_memory_mb.map(|mb| actuator.create_decoy_patterns(mb));
    record(&mut report, CountermeasureStep::DecoyPatterns, decoys);

    let cache = plan.cache_poison_intensity.map(|i| actuator.poison_cache(i));
    record(&mut report, CountermeasureStep::CachePoisoning, cache);

    let fill = plan.fill_ram_percent.map(|p| actuator.fill_available_ram(p));
    record(&mut report, CountermeasureStep::FillRam, fill);

    // always pushed so the actuator can switch obfuscation back off
    let network = Some(actuator.set_network_obfuscation(plan.network_obfuscation));
    record(&mut report, CountermeasureStep::NetworkObfuscation, network);

    log::debug!(
        "Applied {} plan: {} applied, {} failed",
        plan.category,
        report.applied(),
        report.failed()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::threat::AnomalyFlags;
    use parking_lot::Mutex;

    fn analysis(level: f32, cache: bool) -> ThreatAnalysis {
        let flags = AnomalyFlags {
            cache,
            ..Default::default()
        };
        ThreatAnalysis::new(level, level, flags, 0)
    }

    #[derive(Default)]
    struct RecordingActuator {
        calls: Mutex<Vec<String>>,
        fail_cache: bool,
    }

    impl CountermeasureActuator for RecordingActuator {
        fn add_timing_noise(&self, intensity_percent: u32) -> Result<(), ActuatorError> {
            self.calls.lock().push(format!("noise:{}", intensity_percent));
            Ok(())
        }

        fn create_decoy_patterns(&self, size_mb: u32) -> Result<(), ActuatorError> {
            self.calls.lock().push(format!("decoy:{}", size_mb));
            Ok(())
        }

        fn poison_cache(&self, intensity: u32) -> Result<(), ActuatorError> {
            self.calls.lock().push(format!("cache:{}", intensity));
            if self.fail_cache {
                Err(ActuatorError::Failed("no cache access".to_string()))
            } else {
                Ok(())
            }
        }

        fn fill_available_ram(&self, fill_percent: u32) -> Result<(), ActuatorError> {
            self.calls.lock().push(format!("fill:{}", fill_percent));
            Ok(())
        }
    }

    #[test]
    fn test_low_plan() {
        let plan = CountermeasurePlan::from_analysis(&analysis(0.1, true));
        assert_eq!(plan.timing_noise_percent, 5);
        assert_eq!(plan.decoy_memory_mb, None);
        assert_eq!(plan.cache_poison_intensity, None);
        assert_eq!(plan.fill_ram_percent, None);
        assert!(!plan.network_obfuscation);
        assert_eq!(plan.decoy_ratio, 10);
    }

    #[test]
    fn test_high_plan_with_cache_anomaly() {
        let plan = CountermeasurePlan::from_analysis(&analysis(0.75, true));
        assert_eq!(plan.timing_noise_percent, 50);
        assert_eq!(plan.decoy_memory_mb, Some(25));
        assert_eq!(plan.cache_poison_intensity, Some(50));
        assert_eq!(plan.fill_ram_percent, None);
    }

    #[test]
    fn test_nuclear_plan() {
        let plan = CountermeasurePlan::from_analysis(&analysis(0.99, true));
        assert_eq!(plan.timing_noise_percent, 100);
        assert_eq!(plan.decoy_memory_mb, Some(100));
        assert_eq!(plan.cache_poison_intensity, Some(100));
        assert_eq!(plan.fill_ram_percent, Some(30));
        assert!(plan.network_obfuscation);
        assert_eq!(plan.decoy_ratio, 90);
    }

    #[test]
    fn test_apply_runs_every_step_despite_failure() {
        let actuator = RecordingActuator {
            fail_cache: true,
            ..Default::default()
        };
        let plan = CountermeasurePlan::from_analysis(&analysis(0.99, true));
        let report = apply_plan(&plan, &actuator);

        assert_eq!(report.status_of(CountermeasureStep::CachePoisoning), Some(StepStatus::Failed));
        assert_eq!(report.status_of(CountermeasureStep::FillRam), Some(StepStatus::Applied));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.applied(), 4);
        assert_eq!(
            *actuator.calls.lock(),
            vec!["noise:100", "decoy:100", "cache:100", "fill:30"]
        );
    }

    #[test]
    fn test_gated_steps_are_skipped() {
        let plan = CountermeasurePlan::from_analysis(&analysis(0.5, false));
        let report = apply_plan(&plan, &NoopActuator);
        assert_eq!(report.status_of(CountermeasureStep::DecoyPatterns), Some(StepStatus::Applied));
        assert_eq!(report.status_of(CountermeasureStep::CachePoisoning), Some(StepStatus::Skipped));
        assert_eq!(report.status_of(CountermeasureStep::FillRam), Some(StepStatus::Skipped));
    }

    #[test]
    fn test_timing_noise_actuator() {
        let plan = CountermeasurePlan::from_analysis(&analysis(0.2, false));
        let report = apply_plan(&plan, &TimingNoiseActuator);
        assert_eq!(report.status_of(CountermeasureStep::TimingNoise), Some(StepStatus::Applied));
    }
}
