//! Error handling
//!
//! Typed errors for every fallible operation in the crate. Verification
//! failure is not here: `verify` answers `Ok(false)`.

use serde::Serialize;
use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// CRYPTO
// ============================================================================

/// Which input a size check was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyMaterial {
    PublicKey,
    SecretKey,
    Ciphertext,
    Signature,
}

impl KeyMaterial {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMaterial::PublicKey => "public key",
            KeyMaterial::SecretKey => "secret key",
            KeyMaterial::Ciphertext => "ciphertext",
            KeyMaterial::Signature => "signature",
        }
    }
}

impl std::fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("{algorithm}: invalid {material} size: {actual} (expected {expected})")]
    InvalidKeyMaterial {
        algorithm: &'static str,
        material: KeyMaterial,
        expected: usize,
        actual: usize,
    },

    #[error("{algorithm}: keypair generation failed: {reason}")]
    KeyGenerationFailure { algorithm: &'static str, reason: String },

    #[error("{algorithm}: encapsulation failed: {reason}")]
    EncapsulationFailure { algorithm: &'static str, reason: String },

    #[error("{algorithm}: decapsulation failed: {reason}")]
    DecapsulationFailure { algorithm: &'static str, reason: String },

    #[error("{algorithm}: signing failed: {reason}")]
    SigningFailure { algorithm: &'static str, reason: String },
}

impl CryptoError {
    pub fn is_invalid_key_material(&self) -> bool {
        matches!(self, CryptoError::InvalidKeyMaterial { .. })
    }
}

/// Reject any input whose length differs from the parameter set's contract.
pub(crate) fn check_len(
    algorithm: &'static str,
    material: KeyMaterial,
    expected: usize,
    bytes: &[u8],
) -> CryptoResult<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(CryptoError::InvalidKeyMaterial {
            algorithm,
            material,
            expected,
            actual: bytes.len(),
        })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine not initialized: call initialize() first")]
    NotInitialized,

    #[error("engine has been shut down and cannot be restarted")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// PROBES
// ============================================================================

/// Probe failure. The sampler recovers locally by reading zero confidence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("probe unavailable: {0}")]
    Unavailable(String),

    #[error("probe failed: {0}")]
    Failed(String),
}

// ============================================================================
// TIMING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("invalid delay range: min {min_us}us > max {max_us}us")]
    InvalidRange { min_us: u32, max_us: u32 },

    #[error("delay {max_us}us exceeds bound of {bound_us}us")]
    ExceedsBound { max_us: u32, bound_us: u32 },

    #[error("percentage out of range: {0} (expected 0-100)")]
    InvalidPercent(u32),
}

// ============================================================================
// ACTUATOR
// ============================================================================

/// Failure reported by an embedding application's countermeasure actuator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("countermeasure not supported: {0}")]
    Unsupported(&'static str),

    #[error("countermeasure failed: {0}")]
    Failed(String),
}
