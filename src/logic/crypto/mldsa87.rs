//! ML-DSA-87 (FIPS 204)

use pqcrypto_mldsa::mldsa87;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

use crate::logic::error::{CryptoError, CryptoResult};

use super::signature::DigitalSignature;
use super::types::{KeyPair, Signature};

#[derive(Debug, Clone, Copy, Default)]
pub struct MlDsa87;

impl DigitalSignature for MlDsa87 {
    const ALGORITHM: &'static str = "ML-DSA-87";
    const PUBLIC_KEY_BYTES: usize = 2592;
    const SECRET_KEY_BYTES: usize = 4896;
    const SIGNATURE_BYTES: usize = 4627;

    fn raw_generate_keypair() -> CryptoResult<KeyPair> {
        let (pk, sk) = mldsa87::keypair();
        Ok(KeyPair::new(pk.as_bytes().to_vec(), sk.as_bytes().to_vec()))
    }

    fn raw_sign(message: &[u8], secret_key: &[u8]) -> CryptoResult<Signature> {
        let sk = mldsa87::SecretKey::from_bytes(secret_key).map_err(|e| {
            CryptoError::SigningFailure {
                algorithm: Self::ALGORITHM,
                reason: format!("{:?}", e),
            }
        })?;

        let sig = mldsa87::detached_sign(message, &sk);
        Ok(sig.as_bytes().to_vec())
    }

    fn raw_verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(pk) = mldsa87::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = mldsa87::DetachedSignature::from_bytes(signature) else {
            return false;
        };

        mldsa87::verify_detached_signature(&sig, message, &pk).is_ok()
    }
}
