//! Logic Module - Engine, Classification & Primitives
//!
//! ## Layout
//! - `threat/` - Snapshot type, thresholds, classifier
//! - `probes` - Probe interface and aggregation into snapshots
//! - `engine/` - Sampling lifecycle, publish/subscribe, listeners
//! - `response/` - Countermeasure plans and the actuator seam
//! - `timing` - Bounded blocking delays
//! - `crypto/` - KEM and signature parameter sets
//! - `config`, `error` - Ambient configuration and error types

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod probes;
pub mod response;
pub mod threat;
pub mod timing;
