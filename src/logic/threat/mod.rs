//! Threat Module
//!
//! Classifies an environment-risk snapshot into a category and derives the
//! countermeasure posture from it.
//!
//! ## Structure
//! - `types`: Core types (ThreatAnalysis, ThreatCategory, AnomalyFlags, etc.)
//! - `rules`: Thresholds and scaling tables
//! - `classifier`: Classification logic
//!
//! ## Usage
//! ```ignore
//! use countermeasure_core::logic::threat::{classify, ThreatAnalysis, ThreatCategory};
//!
//! let result = classify(&analysis);
//! match result.category {
//!     ThreatCategory::Low => relax(),
//!     ThreatCategory::Nuclear => lock_down(),
//!     _ => harden(result.chaos_intensity),
//! }
//! ```

pub mod types;
pub mod rules;
pub mod classifier;

// Re-export main types for convenience
pub use types::{
    AnomalyFlags,
    ClassificationResult,
    CountermeasureGates,
    ThreatAnalysis,
    ThreatCategory,
};

pub use rules::{
    CRITICAL_THRESHOLD,
    HIGH_THRESHOLD,
    MEDIUM_THRESHOLD,
    NUCLEAR_THRESHOLD,
};

pub use classifier::{
    categorize,
    category_label,
    chaos_intensity,
    classify,
    decoy_ratio,
    gates,
    should_enable_cache_poisoning,
    should_enable_memory_protection,
    should_enable_network_obfuscation,
    keystroke_delay_bounds,
    threat_percentage,
};
