//! Response Module - Graduated Countermeasures
//!
//! # Components
//! - `types.rs`: Plan, steps and apply report
//! - `plan.rs`: Snapshot -> plan, actuator trait, plan application

pub mod plan;
pub mod types;

pub use types::{ApplyReport, CountermeasurePlan, CountermeasureStep, StepResult, StepStatus};

pub use plan::{
    apply_plan, decoy_memory_mb, CountermeasureActuator, NoopActuator, TimingNoiseActuator,
};
