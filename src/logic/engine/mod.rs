//! Countermeasure Engine
//!
//! Owns the sampling lifecycle: probes -> `ThreatAnalysis` -> current slot ->
//! subscribers -> actuator.
//!
//! ## Structure
//! - `listeners`: callback registry with per-listener delivery threads
//! - `status`: lifecycle state and counters for diagnostics
//!
//! ## Lifecycle
//! `Stopped` --start_monitoring--> `Monitoring` --stop_monitoring--> `Stopped`,
//! and `shutdown()` from either state is terminal.
//!
//! The engine is an ordinary value: construct one at the composition root and
//! hand out `Arc<CountermeasureEngine>` to whoever needs it.

pub mod listeners;
pub mod status;


use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::config::{clamp_interval_ms, EngineConfig};
use super::error::{EngineError, EngineResult};
use super::probes::{ProbeSet, ThreatAssessor, ThreatProbe};
use super::response::{apply_plan, CountermeasureActuator, CountermeasurePlan};
use super::threat::ThreatAnalysis;

pub use listeners::{ListenerId, ThreatLevelChangeListener};
pub use status::{EngineState, EngineStatus};

use listeners::ListenerRegistry;
use status::EngineCounters;

// ============================================================================
// INTERNAL STATE
// ============================================================================

enum Lifecycle {
    Stopped,
    Monitoring {
        interval_ms: u64,
        stop_tx: mpsc::Sender<()>,
        handle: JoinHandle<()>,
    },
    ShutDown,
}

/// Everything a tick mutates. Held for the whole tick, so ticks never overlap.
struct Sampler {
    probes: ProbeSet,
    assessor: ThreatAssessor,
    last_timestamp_ms: u64,
    last_notified: Option<ThreatAnalysis>,
}

struct Inner {
    config: EngineConfig,
    actuator: Option<Arc<dyn CountermeasureActuator>>,
    lifecycle: Mutex<Lifecycle>,
    initialized: AtomicBool,
    sampler: Mutex<Sampler>,
    current: RwLock<Option<ThreatAnalysis>>,
    broadcast: Mutex<Option<broadcast::Sender<ThreatAnalysis>>>,
    listeners: ListenerRegistry,
    counters: EngineCounters,
    clock: Instant,
    started_at: Mutex<Option<DateTime<Utc>>>,
    last_sample_at: Mutex<Option<DateTime<Utc>>>,
}

/// Whether `next` is worth publishing given the last published snapshot
pub fn should_notify(
    last: Option<&ThreatAnalysis>,
    next: &ThreatAnalysis,
    level_delta: Option<f32>,
) -> bool {
    let Some(last) = last else {
        return true;
    };

    if last.threat_category() != next.threat_category() {
        return true;
    }

    match level_delta {
        Some(delta) => (next.threat_level() - last.threat_level()).abs() >= delta,
        None => false,
    }
}

impl Inner {
    fn tick(&self) -> ThreatAnalysis {
        let analysis = {
            let mut sampler = self.sampler.lock();

            let outcome = sampler.probes.sample();
            for (kind, err) in &outcome.failures {
                log::warn!("Probe {} unavailable, reading as benign: {}", kind, err);
            }
            EngineCounters::bump(&self.counters.probe_failures, outcome.failures.len() as u64);

            let now_ms = self.clock.elapsed().as_millis() as u64;
            let timestamp_ms = now_ms.max(sampler.last_timestamp_ms);
            sampler.last_timestamp_ms = timestamp_ms;

            let analysis = sampler.assessor.assess(&outcome.readings, timestamp_ms);

            *self.current.write() = Some(analysis);
            EngineCounters::bump(&self.counters.ticks, 1);
            *self.last_sample_at.lock() = Some(Utc::now());

            log::debug!(
                "Tick: level {:.2} ({}), confidence {:.2}, {} anomalies",
                analysis.threat_level(),
                analysis.threat_category(),
                analysis.hypervisor_confidence(),
                analysis.anomalies().count()
            );

            if should_notify(
                sampler.last_notified.as_ref(),
                &analysis,
                self.config.notify_level_delta,
            ) {
                match sampler.last_notified {
                    Some(last) if last.threat_category() != analysis.threat_category() => {
                        log::info!(
                            "Threat level changed: {} -> {} ({}%)",
                            last.threat_category(),
                            analysis.threat_category(),
                            analysis.threat_percentage()
                        );
                    }
                    _ => {}
                }

                sampler.last_notified = Some(analysis);
                self.publish(&analysis);
            }

            analysis
        };

        self.apply_countermeasures(&analysis);
        analysis
    }

    fn publish(&self, analysis: &ThreatAnalysis) {
        if let Some(sender) = self.broadcast.lock().as_ref() {
            // no receivers is fine
            let _ = sender.send(*analysis);
        }
        self.listeners.dispatch(analysis);
        EngineCounters::bump(&self.counters.notifications, 1);
    }

    fn apply_countermeasures(&self, analysis: &ThreatAnalysis) {
        if !self.config.apply_countermeasures {
            return;
        }
        let Some(actuator) = self.actuator.as_ref() else {
            return;
        };

        let plan = CountermeasurePlan::from_analysis(analysis);
        match panic::catch_unwind(AssertUnwindSafe(|| apply_plan(&plan, actuator.as_ref()))) {
            Ok(report) => {
                EngineCounters::bump(&self.counters.countermeasure_failures, report.failed() as u64);
            }
            Err(_) => {
                EngineCounters::bump(&self.counters.countermeasure_failures, 1);
                log::warn!("Countermeasure actuator panicked - continuing");
            }
        }
    }
}

fn sampler_loop(inner: Arc<Inner>, interval: Duration, stop_rx: mpsc::Receiver<()>) {
    log::info!("Threat sampler started ({}ms)", interval.as_millis());

    loop {
        inner.tick();

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Threat sampler stopped");
}

fn stop_worker(stop_tx: mpsc::Sender<()>, handle: JoinHandle<()>) {
    let _ = stop_tx.send(());

    // shutdown from inside the sampler thread cannot join itself
    if handle.thread().id() == thread::current().id() {
        return;
    }
    if handle.join().is_err() {
        log::error!("Threat sampler thread panicked");
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct CountermeasureEngine {
    inner: Arc<Inner>,
}

impl Default for CountermeasureEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CountermeasureEngine {
    /// Engine with no probes (every reading benign) and no actuator
    pub fn new(config: EngineConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ---- lifecycle --------------------------------------------------------

    /// Bind probes. Idempotent; false once the engine is shut down.
    pub fn initialize(&self) -> bool {
        if matches!(*self.inner.lifecycle.lock(), Lifecycle::ShutDown) {
            log::error!("initialize() called on a shut-down engine");
            return false;
        }
        if self.inner.initialized.load(Ordering::Acquire) {
            return true;
        }

        let mut sampler = self.inner.sampler.lock();
        // re-check under the lock so concurrent callers initialize once
        if self.inner.initialized.load(Ordering::Acquire) {
            return true;
        }

        let total = sampler.probes.len();
        let ready = sampler.probes.initialize();
        self.inner.initialized.store(true, Ordering::Release);

        log::info!("Countermeasure engine initialized ({}/{} probes ready)", ready, total);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    fn ensure_initialized(&self, operation: &str) -> EngineResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        log::error!("{} called before initialize()", operation);
        debug_assert!(false, "{} called before initialize()", operation);
        Err(EngineError::NotInitialized)
    }

    /// Start the background sampler. A second call while monitoring is a
    /// no-op, whatever interval it asks for.
    pub fn start_monitoring(&self, interval_ms: u64) -> EngineResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::ShutDown => return Err(EngineError::ShutDown),
            Lifecycle::Monitoring { interval_ms: running, .. } => {
                log::debug!("Already monitoring every {}ms - ignoring start", running);
                return Ok(());
            }
            Lifecycle::Stopped => {}
        }

        self.ensure_initialized("start_monitoring")?;

        let interval_ms = clamp_interval_ms(interval_ms);
        let (stop_tx, stop_rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);

        let handle = thread::Builder::new()
            .name("threat-sampler".to_string())
            .spawn(move || sampler_loop(inner, Duration::from_millis(interval_ms), stop_rx))?;

        *lifecycle = Lifecycle::Monitoring {
            interval_ms,
            stop_tx,
            handle,
        };
        *self.inner.started_at.lock() = Some(Utc::now());
        Ok(())
    }

    /// `start_monitoring` with the configured default interval
    pub fn start_monitoring_default(&self) -> EngineResult<()> {
        self.start_monitoring(self.inner.config.default_interval_ms)
    }

    /// Idempotent. Returns once the sampler thread has exited.
    pub fn stop_monitoring(&self) {
        let previous = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Monitoring { .. }) {
                return;
            }
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        if let Lifecycle::Monitoring { stop_tx, handle, .. } = previous {
            stop_worker(stop_tx, handle);
        }
    }

    /// Tear everything down. Terminal: a shut-down engine cannot be restarted.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.inner.lifecycle.lock(), Lifecycle::ShutDown);

        match previous {
            Lifecycle::ShutDown => return,
            Lifecycle::Monitoring { stop_tx, handle, .. } => stop_worker(stop_tx, handle),
            Lifecycle::Stopped => {}
        }

        self.inner.listeners.close();
        self.inner.broadcast.lock().take();
        log::info!("Countermeasure engine shut down");
    }

    pub fn state(&self) -> EngineState {
        match *self.inner.lifecycle.lock() {
            Lifecycle::Stopped => EngineState::Stopped,
            Lifecycle::Monitoring { .. } => EngineState::Monitoring,
            Lifecycle::ShutDown => EngineState::ShutDown,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.state() == EngineState::Monitoring
    }

    // ---- sampling ---------------------------------------------------------

    /// Last published snapshot, `None` until the first tick
    pub fn current_threat(&self) -> Option<ThreatAnalysis> {
        *self.inner.current.read()
    }

    /// Run one tick on the calling thread, serialized with the sampler.
    pub fn sample_now(&self) -> EngineResult<ThreatAnalysis> {
        if self.state() == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        self.ensure_initialized("sample_now")?;
        Ok(self.inner.tick())
    }

    // ---- subscribers ------------------------------------------------------

    /// Receiver for every published snapshot. On a shut-down engine the
    /// receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<ThreatAnalysis> {
        match self.inner.broadcast.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn add_threat_level_change_listener<L>(&self, listener: L) -> EngineResult<ListenerId>
    where
        L: ThreatLevelChangeListener + 'static,
    {
        self.add_listener_arc(Arc::new(listener))
    }

    pub fn add_listener_arc(
        &self,
        listener: Arc<dyn ThreatLevelChangeListener>,
    ) -> EngineResult<ListenerId> {
        self.inner.listeners.add(listener)
    }

    pub fn remove_threat_level_change_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    // ---- diagnostics ------------------------------------------------------

    pub fn status(&self) -> EngineStatus {
        let (state, interval_ms) = match &*self.inner.lifecycle.lock() {
            Lifecycle::Stopped => (EngineState::Stopped, None),
            Lifecycle::Monitoring { interval_ms, .. } => (EngineState::Monitoring, Some(*interval_ms)),
            Lifecycle::ShutDown => (EngineState::ShutDown, None),
        };
        let counters = &self.inner.counters;

        EngineStatus {
            state,
            initialized: self.is_initialized(),
            interval_ms,
            ticks: EngineCounters::read(&counters.ticks),
            notifications: EngineCounters::read(&counters.notifications),
            probe_failures: EngineCounters::read(&counters.probe_failures),
            listener_failures: self.inner.listeners.failures(),
            countermeasure_failures: EngineCounters::read(&counters.countermeasure_failures),
            listener_count: self.inner.listeners.len(),
            subscriber_count: self
                .inner
                .broadcast
                .lock()
                .as_ref()
                .map(|s| s.receiver_count())
                .unwrap_or(0),
            probe_count: self.inner.sampler.lock().probes.len(),
            current_category: self.current_threat().map(|a| a.threat_category()),
            started_at: *self.inner.started_at.lock(),
            last_sample_at: *self.inner.last_sample_at.lock(),
        }
    }
}

impl Drop for CountermeasureEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CountermeasureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountermeasureEngine")
            .field("state", &self.state())
            .field("initialized", &self.is_initialized())
            .field("config", &self.inner.config)
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    probes: ProbeSet,
    actuator: Option<Arc<dyn CountermeasureActuator>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register a probe; a later probe of the same kind replaces the earlier one
    pub fn probe<P>(self, probe: P) -> Self
    where
        P: ThreatProbe + 'static,
    {
        self.probe_arc(Arc::new(probe))
    }

    pub fn probe_arc(mut self, probe: Arc<dyn ThreatProbe>) -> Self {
        if let Some(old) = self.probes.insert(probe) {
            log::debug!("Replacing {} probe", old.kind());
        }
        self
    }

    pub fn actuator<A>(mut self, actuator: A) -> Self
    where
        A: CountermeasureActuator + 'static,
    {
        self.actuator = Some(Arc::new(actuator));
        self
    }

    pub fn actuator_arc(mut self, actuator: Arc<dyn CountermeasureActuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    pub fn build(self) -> CountermeasureEngine {
        let config = self.config.unwrap_or_default().normalized();
        let (sender, _) = broadcast::channel(config.broadcast_capacity);
        let assessor =
            ThreatAssessor::new(config.consecutive_boost_after, config.consecutive_boost_factor);

        CountermeasureEngine {
            inner: Arc::new(Inner {
                actuator: self.actuator,
                lifecycle: Mutex::new(Lifecycle::Stopped),
                initialized: AtomicBool::new(false),
                sampler: Mutex::new(Sampler {
                    probes: self.probes,
                    assessor,
                    last_timestamp_ms: 0,
                    last_notified: None,
                }),
                current: RwLock::new(None),
                broadcast: Mutex::new(Some(sender)),
                listeners: ListenerRegistry::default(),
                counters: EngineCounters::default(),
                clock: Instant::now(),
                started_at: Mutex::new(None),
                last_sample_at: Mutex::new(None),
                config,
            }),
        }
    }
}
