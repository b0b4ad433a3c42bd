//! Key Encapsulation
//!
//! One contract for every KEM parameter set: fixed sizes, size checks on every
//! input, typed errors, and no truncated or padded output.

use crate::logic::error::{check_len, CryptoError, CryptoResult, KeyMaterial};

use super::types::{EncapsulationResult, KeyPair, SharedSecret};

/// A KEM parameter set.
///
/// Implementors provide the `raw_*` primitives; callers use the provided
/// methods, which validate input and output lengths around them.
pub trait KeyEncapsulation {
    const ALGORITHM: &'static str;
    const PUBLIC_KEY_BYTES: usize;
    const SECRET_KEY_BYTES: usize;
    const CIPHERTEXT_BYTES: usize;
    const SHARED_SECRET_BYTES: usize;

    fn raw_generate_keypair() -> CryptoResult<KeyPair>;

    /// `public_key` is already exactly `PUBLIC_KEY_BYTES` long.
    fn raw_encapsulate(public_key: &[u8]) -> CryptoResult<EncapsulationResult>;

    /// Inputs are already exactly `CIPHERTEXT_BYTES` / `SECRET_KEY_BYTES` long.
    fn raw_decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> CryptoResult<SharedSecret>;

    fn generate_keypair() -> CryptoResult<KeyPair> {
        let pair = Self::raw_generate_keypair()?;

        if pair.public_key.len() != Self::PUBLIC_KEY_BYTES
            || pair.secret_key.len() != Self::SECRET_KEY_BYTES
        {
            return Err(CryptoError::KeyGenerationFailure {
                algorithm: Self::ALGORITHM,
                reason: format!(
                    "unexpected key sizes: public {} secret {}",
                    pair.public_key.len(),
                    pair.secret_key.len()
                ),
            });
        }

        log::debug!("Generated {} keypair ({})", Self::ALGORITHM, pair.fingerprint());
        Ok(pair)
    }

    fn encapsulate(public_key: &[u8]) -> CryptoResult<EncapsulationResult> {
        check_len(Self::ALGORITHM, KeyMaterial::PublicKey, Self::PUBLIC_KEY_BYTES, public_key)?;

        let result = Self::raw_encapsulate(public_key)?;

        if result.ciphertext.len() != Self::CIPHERTEXT_BYTES
            || result.shared_secret.len() != Self::SHARED_SECRET_BYTES
        {
            return Err(CryptoError::EncapsulationFailure {
                algorithm: Self::ALGORITHM,
                reason: format!(
                    "unexpected output sizes: ciphertext {} shared secret {}",
                    result.ciphertext.len(),
                    result.shared_secret.len()
                ),
            });
        }

        log::debug!("{} encapsulation complete", Self::ALGORITHM);
        Ok(result)
    }

    fn decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> CryptoResult<SharedSecret> {
        check_len(Self::ALGORITHM, KeyMaterial::Ciphertext, Self::CIPHERTEXT_BYTES, ciphertext)?;
        check_len(Self::ALGORITHM, KeyMaterial::SecretKey, Self::SECRET_KEY_BYTES, secret_key)?;

        let shared_secret = Self::raw_decapsulate(ciphertext, secret_key)?;

        if shared_secret.len() != Self::SHARED_SECRET_BYTES {
            return Err(CryptoError::DecapsulationFailure {
                algorithm: Self::ALGORITHM,
                reason: format!("unexpected shared secret size: {}", shared_secret.len()),
            });
        }

        log::debug!("{} decapsulation complete", Self::ALGORITHM);
        Ok(shared_secret)
    }

    /// Self-contained round trip: server keypair, client encapsulates, server
    /// decapsulates. Returns `(client_secret, server_secret)`.
    fn perform_key_exchange() -> CryptoResult<(SharedSecret, SharedSecret)> {
        let server_keypair = Self::generate_keypair()?;
        let client_result = Self::encapsulate(&server_keypair.public_key)?;
        let server_secret = Self::decapsulate(&client_result.ciphertext, &server_keypair.secret_key)?;

        Ok((client_result.shared_secret.clone(), server_secret))
    }
}

// ============================================================================
// RUNTIME SELECTION
// ============================================================================

/// Runtime handle over the available KEM parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KemParameterSet {
    /// Kyber-1024 (pre-standard round-3 parameters)
    Legacy,
    /// ML-KEM-1024 (FIPS 203)
    Fips203,
}

impl KemParameterSet {
    pub const ALL: [KemParameterSet; 2] = [KemParameterSet::Legacy, KemParameterSet::Fips203];

    pub fn algorithm(&self) -> &'static str {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::ALGORITHM,
            KemParameterSet::Fips203 => super::MlKem1024::ALGORITHM,
        }
    }

    pub fn public_key_bytes(&self) -> usize {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::PUBLIC_KEY_BYTES,
            KemParameterSet::Fips203 => super::MlKem1024::PUBLIC_KEY_BYTES,
        }
    }

    pub fn secret_key_bytes(&self) -> usize {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::SECRET_KEY_BYTES,
            KemParameterSet::Fips203 => super::MlKem1024::SECRET_KEY_BYTES,
        }
    }

    pub fn ciphertext_bytes(&self) -> usize {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::CIPHERTEXT_BYTES,
            KemParameterSet::Fips203 => super::MlKem1024::CIPHERTEXT_BYTES,
        }
    }

    pub fn shared_secret_bytes(&self) -> usize {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::SHARED_SECRET_BYTES,
            KemParameterSet::Fips203 => super::MlKem1024::SHARED_SECRET_BYTES,
        }
    }

    pub fn generate_keypair(&self) -> CryptoResult<KeyPair> {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::generate_keypair(),
            KemParameterSet::Fips203 => super::MlKem1024::generate_keypair(),
        }
    }

    pub fn encapsulate(&self, public_key: &[u8]) -> CryptoResult<EncapsulationResult> {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::encapsulate(public_key),
            KemParameterSet::Fips203 => super::MlKem1024::encapsulate(public_key),
        }
    }

    pub fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> CryptoResult<SharedSecret> {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::decapsulate(ciphertext, secret_key),
            KemParameterSet::Fips203 => super::MlKem1024::decapsulate(ciphertext, secret_key),
        }
    }

    pub fn perform_key_exchange(&self) -> CryptoResult<(SharedSecret, SharedSecret)> {
        match self {
            KemParameterSet::Legacy => super::Kyber1024::perform_key_exchange(),
            KemParameterSet::Fips203 => super::MlKem1024::perform_key_exchange(),
        }
    }
}

impl std::fmt::Display for KemParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.algorithm())
    }
}
