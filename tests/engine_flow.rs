//! End-to-end: probes -> engine -> subscribers -> consumer decisions.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use countermeasure_core::logic::threat::keystroke_delay_bounds;
use countermeasure_core::logic::timing;
use countermeasure_core::prelude::*;
use countermeasure_core::{ActuatorError, AnomalyFlags, EngineState};

#[derive(Default)]
struct DecoyActuator {
    decoy_mb: AtomicU32,
    network_on: AtomicUsize,
}

impl CountermeasureActuator for DecoyActuator {
    fn create_decoy_patterns(&self, size_mb: u32) -> Result<(), ActuatorError> {
        self.decoy_mb.store(size_mb, Ordering::SeqCst);
        Ok(())
    }

    fn set_network_obfuscation(&self, enabled: bool) -> Result<(), ActuatorError> {
        if enabled {
            self.network_on.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[test]
fn classifier_scenarios() {
    let low = ThreatAnalysis::from_level(0.10, 0);
    assert_eq!(low.threat_category(), ThreatCategory::Low);
    assert_eq!((low.chaos_intensity(), low.decoy_ratio()), (10, 10));

    let timing_only = AnomalyFlags {
        timing: true,
        ..Default::default()
    };
    let medium = ThreatAnalysis::new(0.50, 0.50, timing_only, 0);
    assert_eq!(medium.threat_category(), ThreatCategory::Medium);
    assert_eq!((medium.chaos_intensity(), medium.decoy_ratio()), (60, 30));
    assert!(medium.should_enable_memory_protection());
    assert!(!medium.should_enable_cache_poisoning());
    assert!(!medium.should_enable_network_obfuscation());

    let cache_and_memory = AnomalyFlags {
        cache: true,
        memory: true,
        ..Default::default()
    };
    let high = ThreatAnalysis::new(0.75, 0.75, cache_and_memory, 0);
    assert_eq!(high.threat_category(), ThreatCategory::High);
    assert_eq!((high.chaos_intensity(), high.decoy_ratio()), (100, 50));
    assert!(high.should_enable_memory_protection());
    assert!(high.should_enable_cache_poisoning());
    assert!(!high.should_enable_network_obfuscation());

    let nuclear = ThreatAnalysis::from_level(0.98, 0);
    assert_eq!(nuclear.threat_category(), ThreatCategory::Nuclear);
    assert_eq!((nuclear.chaos_intensity(), nuclear.decoy_ratio()), (200, 90));
}

#[test]
fn snapshots_are_clamped() {
    let a = ThreatAnalysis::new(3.0, -1.0, AnomalyFlags::none(), 0);
    assert_eq!(a.threat_level(), 1.0);
    assert_eq!(a.hypervisor_confidence(), 0.0);
}

#[test]
fn full_pipeline_with_weighted_probes() {
    let actuator = Arc::new(DecoyActuator::default());
    let engine = CountermeasureEngine::builder()
        .config(EngineConfig {
            consecutive_boost_after: 0,
            ..EngineConfig::fast()
        })
        .probe(StaticProbe::new(ProbeKind::Timing, 1.0))
        .probe(StaticProbe::new(ProbeKind::Cache, 1.0))
        .probe(StaticProbe::new(ProbeKind::PerfCounter, 1.0))
        .probe(StaticProbe::new(ProbeKind::Memory, 1.0))
        .actuator_arc(actuator.clone())
        .build();

    assert!(engine.initialize());
    let mut rx = engine.subscribe();

    let analysis = engine.sample_now().unwrap();
    assert_eq!(analysis.threat_category(), ThreatCategory::Nuclear);
    assert_eq!(analysis.anomalies(), AnomalyFlags::all());
    assert_eq!(rx.try_recv().unwrap(), analysis);

    // consumer decisions all go through the classifier
    assert_eq!(keystroke_delay_bounds(analysis.threat_category()), Some((1_000, 3_000)));
    assert!(timing::apply_keystroke_delay(&analysis).unwrap() >= Duration::from_micros(1_000));

    assert_eq!(actuator.decoy_mb.load(Ordering::SeqCst), 100);
    assert_eq!(actuator.network_on.load(Ordering::SeqCst), 1);
}

#[test]
fn background_monitoring_round_trip() {
    let level = Arc::new(AtomicU32::new(0.2f32.to_bits()));
    let reading = Arc::clone(&level);

    let engine = CountermeasureEngine::builder()
        .config(EngineConfig {
            consecutive_boost_after: 0,
            ..EngineConfig::fast()
        })
        .probe(FnProbe::new(ProbeKind::Hypervisor, move || {
            Ok(f32::from_bits(reading.load(Ordering::SeqCst)))
        }))
        .build();
    engine.initialize();

    let (tx, rx) = std::sync::mpsc::channel();
    let tx = parking_lot::Mutex::new(tx);
    engine
        .add_threat_level_change_listener(move |a: &ThreatAnalysis| {
            let _ = tx.lock().send(a.threat_category());
        })
        .unwrap();

    engine.start_monitoring(10).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), ThreatCategory::Low);

    level.store(0.9f32.to_bits(), Ordering::SeqCst);
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        ThreatCategory::Critical
    );

    engine.stop_monitoring();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(
        engine.current_threat().map(|a| a.threat_category()),
        Some(ThreatCategory::Critical)
    );

    drop(engine);
    // dropping the engine shuts it down and closes listener queues
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}
