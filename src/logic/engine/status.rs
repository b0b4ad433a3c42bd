use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::threat::ThreatCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Stopped,
    Monitoring,
    ShutDown,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Stopped => "stopped",
            EngineState::Monitoring => "monitoring",
            EngineState::ShutDown => "shut_down",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub initialized: bool,
    /// Sampling interval while monitoring
    pub interval_ms: Option<u64>,

    pub ticks: u64,
    pub notifications: u64,
    pub probe_failures: u64,
    pub listener_failures: u64,
    pub countermeasure_failures: u64,

    pub listener_count: usize,
    pub subscriber_count: usize,
    pub probe_count: usize,

    pub current_category: Option<ThreatCategory>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_sample_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub ticks: AtomicU64,
    pub notifications: AtomicU64,
    pub probe_failures: AtomicU64,
    pub countermeasure_failures: AtomicU64,
}

impl EngineCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
