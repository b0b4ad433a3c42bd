//! Adaptive threat-response engine and post-quantum primitives.
//!
//! A periodically sampled environment-risk score is classified into a
//! `ThreatCategory`, published to subscribers and turned into a graduated
//! countermeasure plan. The KEM and signature parameter sets share one strict
//! size contract with typed errors.
//!
//! ```ignore
//! use countermeasure_core::prelude::*;
//!
//! let engine = CountermeasureEngine::builder()
//!     .config(EngineConfig::from_env())
//!     .probe(my_hypervisor_probe)
//!     .build();
//! engine.initialize();
//! engine.start_monitoring_default()?;
//!
//! let mut rx = engine.subscribe();
//! while let Ok(analysis) = rx.recv().await {
//!     if analysis.should_enable_network_obfuscation() { /* ... */ }
//! }
//! ```

pub mod constants;
pub mod logic;

pub use logic::config::EngineConfig;
pub use logic::crypto::{
    DigitalSignature, EncapsulationResult, KemParameterSet, KeyEncapsulation, KeyPair, Kyber1024,
    MlDsa87, MlKem1024, SharedSecret, Signature,
};
pub use logic::engine::{
    CountermeasureEngine, EngineBuilder, EngineState, EngineStatus, ListenerId,
    ThreatLevelChangeListener,
};
pub use logic::error::{
    ActuatorError, ConfigError, CryptoError, CryptoResult, EngineError, EngineResult, KeyMaterial,
    ProbeError, TimingError,
};
pub use logic::probes::{FnProbe, ProbeKind, StaticProbe, ThreatAssessor, ThreatProbe};
pub use logic::response::{apply_plan, ApplyReport, CountermeasureActuator, CountermeasurePlan};
pub use logic::threat::{AnomalyFlags, ClassificationResult, ThreatAnalysis, ThreatCategory};

/// Everything a typical consumer needs, traits included
pub mod prelude {
    pub use crate::logic::crypto::{DigitalSignature, KeyEncapsulation, Kyber1024, MlDsa87, MlKem1024};
    pub use crate::logic::engine::{CountermeasureEngine, ListenerId, ThreatLevelChangeListener};
    pub use crate::logic::probes::{FnProbe, ProbeKind, StaticProbe, ThreatProbe};
    pub use crate::logic::response::{CountermeasureActuator, CountermeasurePlan};
    pub use crate::logic::threat::{ThreatAnalysis, ThreatCategory};
    pub use crate::EngineConfig;
}
