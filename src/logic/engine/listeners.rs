//! Listener Registry
//!
//! Each registered listener gets its own delivery thread fed by an unbounded
//! channel. The sampler only ever enqueues, so a panicking or stalled
//! listener cannot hold up the sampler or any other listener.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::logic::error::{EngineError, EngineResult};
use crate::logic::threat::ThreatAnalysis;

pub trait ThreatLevelChangeListener: Send + Sync {
    fn on_threat_level_changed(&self, analysis: &ThreatAnalysis);
}

impl<F> ThreatLevelChangeListener for F
where
    F: Fn(&ThreatAnalysis) + Send + Sync,
{
    fn on_threat_level_changed(&self, analysis: &ThreatAnalysis) {
        self(analysis)
    }
}

/// Handle returned on registration, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Registry {
    senders: HashMap<ListenerId, Sender<ThreatAnalysis>>,
    closed: bool,
}

pub(crate) struct ListenerRegistry {
    inner: RwLock<Registry>,
    failures: Arc<AtomicU64>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Registry {
                senders: HashMap::new(),
                closed: false,
            }),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ListenerRegistry {
    pub fn add(&self, listener: Arc<dyn ThreatLevelChangeListener>) -> EngineResult<ListenerId> {
        let mut registry = self.inner.write();
        if registry.closed {
            return Err(EngineError::ShutDown);
        }

        let id = ListenerId::new();
        let (tx, rx) = mpsc::channel();
        let failures = Arc::clone(&self.failures);

        thread::Builder::new()
            .name(format!("threat-listener-{}", &id.0.simple().to_string()[..8]))
            .spawn(move || delivery_loop(id, listener, rx, failures))?;

        registry.senders.insert(id, tx);
        log::debug!("Registered threat listener {}", id);
        Ok(id)
    }

    /// Returns false if `id` was not registered. Snapshots already queued for
    /// the listener are still delivered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let removed = self.inner.write().senders.remove(&id).is_some();
        if removed {
            log::debug!("Removed threat listener {}", id);
        }
        removed
    }

    pub fn dispatch(&self, analysis: &ThreatAnalysis) {
        let registry = self.inner.read();
        for (id, tx) in registry.senders.iter() {
            if tx.send(*analysis).is_err() {
                log::warn!("Threat listener {} delivery thread is gone", id);
            }
        }
    }

    /// Drop every registration and refuse new ones. Delivery threads exit
    /// once their queues drain.
    pub fn close(&self) {
        let mut registry = self.inner.write();
        registry.closed = true;
        registry.senders.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().senders.len()
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

fn delivery_loop(
    id: ListenerId,
    listener: Arc<dyn ThreatLevelChangeListener>,
    rx: Receiver<ThreatAnalysis>,
    failures: Arc<AtomicU64>,
) {
    while let Ok(analysis) = rx.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            listener.on_threat_level_changed(&analysis)
        }));

        if result.is_err() {
            failures.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Threat listener {} panicked handling {} snapshot - continuing",
                id,
                analysis.threat_category()
            );
        }
    }
}
