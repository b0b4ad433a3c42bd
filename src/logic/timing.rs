//! Timing Obfuscation
//!
//! Bounded, synchronous random delays. Everything here blocks the calling
//! thread on purpose: the point is to delay the observable event itself.
//! Callers keep these off latency-critical paths.

use std::time::{Duration, Instant};

use rand::Rng;

use super::error::TimingError;
use super::threat::{keystroke_delay_bounds, ThreatAnalysis};

/// Hard upper bound for a single `random_delay` call (µs)
pub const MAX_DELAY_US: u32 = 50_000;

/// Busy-wait per intensity point in `add_timing_noise` (µs)
const NOISE_US_PER_INTENSITY: u32 = 50;

/// `execute_with_obfuscation` pre/post delay per chaos point, and their caps (µs)
const PRE_DELAY_US_PER_CHAOS: u32 = 100;
const PRE_DELAY_CAP_US: u32 = 10_000;
const POST_DELAY_US_PER_CHAOS: u32 = 150;
const POST_DELAY_CAP_US: u32 = 15_000;

/// Below this a wait is spun rather than slept
const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Block for a uniformly random duration in `[min_us, max_us]` microseconds.
pub fn random_delay(min_us: u32, max_us: u32) -> Result<Duration, TimingError> {
    if min_us > max_us {
        return Err(TimingError::InvalidRange { min_us, max_us });
    }
    if max_us > MAX_DELAY_US {
        return Err(TimingError::ExceedsBound {
            max_us,
            bound_us: MAX_DELAY_US,
        });
    }

    Ok(delay_between(min_us, max_us))
}

/// With probability `intensity_percent / 100`, busy-wait a random duration in
/// `[0, intensity * 50] µs`.
pub fn add_timing_noise(intensity_percent: u32) -> Result<(), TimingError> {
    if intensity_percent > 100 {
        return Err(TimingError::InvalidPercent(intensity_percent));
    }
    noise(intensity_percent);
    Ok(())
}

/// Sleep `base_ms ± base_ms * jitter_percent / 100`, never below zero.
pub fn jitter_sleep(base_ms: u64, jitter_percent: u32) -> Result<Duration, TimingError> {
    if jitter_percent > 100 {
        return Err(TimingError::InvalidPercent(jitter_percent));
    }

    let duration = Duration::from_millis(jittered_ms(base_ms, jitter_percent));
    std::thread::sleep(duration);
    Ok(duration)
}

/// Run `f` between two random delays scaled by `chaos_percent`, then add
/// timing noise at half that intensity.
pub fn execute_with_obfuscation<T, F>(chaos_percent: u32, f: F) -> T
where
    F: FnOnce() -> T,
{
    let pre_max = chaos_percent.saturating_mul(PRE_DELAY_US_PER_CHAOS).min(PRE_DELAY_CAP_US);
    let post_max = chaos_percent.saturating_mul(POST_DELAY_US_PER_CHAOS).min(POST_DELAY_CAP_US);

    delay_between(0, pre_max);
    let result = f();
    delay_between(0, post_max);
    noise(chaos_percent / 2);

    result
}

/// Delay a keystroke according to the snapshot's category. Returns the delay
/// applied (zero at LOW).
pub fn apply_keystroke_delay(analysis: &ThreatAnalysis) -> Result<Duration, TimingError> {
    match keystroke_delay_bounds(analysis.threat_category()) {
        Some((min_us, max_us)) => random_delay(min_us, max_us),
        None => Ok(Duration::ZERO),
    }
}

// ============================================================================
// WAITING
// ============================================================================

/// Uniform in `[min_us, max_us]`, ends clamped to `MAX_DELAY_US`
fn delay_between(min_us: u32, max_us: u32) -> Duration {
    let max_us = max_us.min(MAX_DELAY_US);
    let min_us = min_us.min(max_us);

    let delay = Duration::from_micros(rand::thread_rng().gen_range(min_us..=max_us) as u64);
    wait(delay);
    delay
}

/// Intensity above 100 counts as 100
fn noise(intensity_percent: u32) {
    let intensity = intensity_percent.min(100);
    if intensity == 0 {
        return;
    }

    let mut rng = rand::thread_rng();
    if rng.gen_range(0..100) < intensity {
        let noise_us = rng.gen_range(0..=intensity * NOISE_US_PER_INTENSITY);
        spin(Duration::from_micros(noise_us as u64));
    }
}

/// `base_ms` moved by a uniform offset of at most `base_ms * jitter_percent / 100`
fn jittered_ms(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter = jitter_percent.min(100) as u64;
    // base / 100 * jitter + remainder term never exceeds base, so no overflow
    let spread = base_ms / 100 * jitter + base_ms % 100 * jitter / 100;
    if spread == 0 {
        return base_ms;
    }

    let low = base_ms.saturating_sub(spread);
    let high = base_ms.saturating_add(spread);
    rand::thread_rng().gen_range(low..=high)
}

fn wait(duration: Duration) {
    if duration > SPIN_THRESHOLD {
        let start = Instant::now();
        std::thread::sleep(duration - SPIN_THRESHOLD);
        let remaining = duration.saturating_sub(start.elapsed());
        spin(remaining);
    } else {
        spin(duration);
    }
}

fn spin(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}
