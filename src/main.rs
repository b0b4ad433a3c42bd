//! Countermeasure Core - Diagnostic Entry Point
//!
//! Runs the crypto self-tests, then samples with benign probes and logs every
//! published snapshot until Ctrl-C or `THREAT_RUN_SECS` elapses.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use countermeasure_core::constants::{self, APP_NAME, APP_VERSION};
use countermeasure_core::logic::crypto::KemParameterSet;
use countermeasure_core::logic::response::TimingNoiseActuator;
use countermeasure_core::logic::threat::{classify, keystroke_delay_bounds};
use countermeasure_core::prelude::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{} (diagnostics)", APP_NAME, APP_VERSION);

    let config = match EngineConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Config load failed: {} - falling back to env/defaults", e);
            EngineConfig::from_env()
        }
    };
    log::info!(
        "Interval: {}ms, broadcast capacity: {}, countermeasures: {}",
        config.default_interval_ms,
        config.broadcast_capacity,
        if config.apply_countermeasures { "on" } else { "off" }
    );

    if !run_crypto_self_tests() {
        log::error!("Crypto self-tests failed - refusing to start");
        std::process::exit(1);
    }

    let mut builder = CountermeasureEngine::builder()
        .config(config)
        .actuator(TimingNoiseActuator);
    for kind in [ProbeKind::Timing, ProbeKind::Cache, ProbeKind::PerfCounter, ProbeKind::Memory] {
        builder = builder.probe(StaticProbe::benign(kind));
    }
    let engine = builder.build();

    if !engine.initialize() {
        log::error!("Engine failed to initialize");
        std::process::exit(1);
    }

    let rx = engine.subscribe();
    if let Err(e) = engine.start_monitoring_default() {
        log::error!("Failed to start monitoring: {}", e);
        std::process::exit(1);
    }

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {}", e);
            engine.shutdown();
            std::process::exit(1);
        }
    };
    rt.block_on(watch(rx, constants::get_run_secs()));

    engine.shutdown();
    match serde_json::to_string_pretty(&engine.status()) {
        Ok(json) => log::info!("Final engine status:\n{}", json),
        Err(e) => log::warn!("Could not serialize engine status: {}", e),
    }
}

fn run_crypto_self_tests() -> bool {
    let mut ok = true;

    for set in KemParameterSet::ALL {
        match set.perform_key_exchange() {
            Ok((client, server)) if *client == *server => {
                log::info!("{} key exchange OK ({} byte secret)", set, client.len());
            }
            Ok(_) => {
                log::error!("{} key exchange produced mismatched secrets", set);
                ok = false;
            }
            Err(e) => {
                log::error!("{} key exchange failed: {}", set, e);
                ok = false;
            }
        }

        // wrong-size input must be rejected, never truncated
        match set.encapsulate(&[0u8; 100]) {
            Err(e) if e.is_invalid_key_material() => {}
            other => {
                log::error!("{} accepted a 100-byte public key: {:?}", set, other.map(|_| ()));
                ok = false;
            }
        }
    }

    match MlDsa87::generate_keypair() {
        Ok(pair) => {
            log::info!("{} identity {}", MlDsa87::ALGORITHM, pair.fingerprint());
            match MlDsa87::perform_sign_and_verify(APP_NAME) {
                Ok(true) => log::info!("{} sign/verify OK", MlDsa87::ALGORITHM),
                Ok(false) => {
                    log::error!("{} signature did not verify", MlDsa87::ALGORITHM);
                    ok = false;
                }
                Err(e) => {
                    log::error!("{} sign/verify failed: {}", MlDsa87::ALGORITHM, e);
                    ok = false;
                }
            }
        }
        Err(e) => {
            log::error!("{} keypair generation failed: {}", MlDsa87::ALGORITHM, e);
            ok = false;
        }
    }

    ok
}

async fn watch(mut rx: broadcast::Receiver<ThreatAnalysis>, run_secs: Option<u64>) {
    let deadline = async {
        match run_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Ctrl-C received - shutting down");
                break;
            }
            _ = &mut deadline => {
                log::info!("Run time elapsed - shutting down");
                break;
            }
            msg = rx.recv() => match msg {
                Ok(analysis) => log_snapshot(&analysis),
                Err(RecvError::Lagged(missed)) => log::warn!("Missed {} snapshots", missed),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn log_snapshot(analysis: &ThreatAnalysis) {
    let result = classify(analysis);

    log::info!(
        "[{}ms] {} ({}%) chaos={} decoy={}% gates: memory={} cache={} network={}",
        analysis.analysis_timestamp(),
        result.category,
        analysis.threat_percentage(),
        result.chaos_intensity,
        result.decoy_ratio,
        result.gates.memory_protection,
        result.gates.cache_poisoning,
        result.gates.network_obfuscation
    );

    if let Some((min_us, max_us)) = keystroke_delay_bounds(result.category) {
        log::info!("   keystroke delay {}-{}us", min_us, max_us);
    }
    for reason in &result.reasons {
        log::debug!("   {}", reason);
    }
}
