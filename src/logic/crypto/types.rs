//! Key material types shared by the KEM and signature parameter sets.
//!
//! Secret halves are wiped on drop and never printed.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Shared secret produced by encapsulation/decapsulation
pub type SharedSecret = Zeroizing<Vec<u8>>;

/// Detached signature bytes
pub type Signature = Vec<u8>;

// ============================================================================
// KEY PAIR
// ============================================================================

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)]
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

impl KeyPair {
    pub fn new(public_key: Vec<u8>, secret_key: Vec<u8>) -> Self {
        Self {
            public_key,
            secret_key,
        }
    }

    /// Short identifier for logs: first 8 bytes of SHA-256(public key), hex
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &format_args!("{} bytes", self.public_key.len()))
            .field("secret_key", &format_args!("<{} bytes redacted>", self.secret_key.len()))
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

// ============================================================================
// ENCAPSULATION RESULT
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct EncapsulationResult {
    pub ciphertext: Vec<u8>,
    pub shared_secret: SharedSecret,
}

impl EncapsulationResult {
    pub fn new(ciphertext: Vec<u8>, shared_secret: Vec<u8>) -> Self {
        Self {
            ciphertext,
            shared_secret: Zeroizing::new(shared_secret),
        }
    }
}

impl std::fmt::Debug for EncapsulationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncapsulationResult")
            .field("ciphertext", &format_args!("{} bytes", self.ciphertext.len()))
            .field("shared_secret", &format_args!("<{} bytes redacted>", self.shared_secret.len()))
            .finish()
    }
}

/// First 8 bytes of SHA-256 over `bytes`, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}
