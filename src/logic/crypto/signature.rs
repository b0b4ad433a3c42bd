//! Digital Signatures
//!
//! Same discipline as the KEM side: malformed sizes are `InvalidKeyMaterial`,
//! a well-formed signature that does not verify is `Ok(false)`.

use crate::logic::error::{check_len, CryptoError, CryptoResult, KeyMaterial};

use super::types::{KeyPair, Signature};

pub trait DigitalSignature {
    const ALGORITHM: &'static str;
    const PUBLIC_KEY_BYTES: usize;
    const SECRET_KEY_BYTES: usize;
    const SIGNATURE_BYTES: usize;

    fn raw_generate_keypair() -> CryptoResult<KeyPair>;

    /// `secret_key` is already exactly `SECRET_KEY_BYTES` long.
    fn raw_sign(message: &[u8], secret_key: &[u8]) -> CryptoResult<Signature>;

    /// Inputs are already exactly `SIGNATURE_BYTES` / `PUBLIC_KEY_BYTES` long.
    fn raw_verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;

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

    fn sign<M: AsRef<[u8]>>(message: M, secret_key: &[u8]) -> CryptoResult<Signature> {
        check_len(Self::ALGORITHM, KeyMaterial::SecretKey, Self::SECRET_KEY_BYTES, secret_key)?;

        let signature = Self::raw_sign(message.as_ref(), secret_key)?;

        if signature.len() != Self::SIGNATURE_BYTES {
            return Err(CryptoError::SigningFailure {
                algorithm: Self::ALGORITHM,
                reason: format!("unexpected signature size: {}", signature.len()),
            });
        }

        Ok(signature)
    }

    fn verify<M: AsRef<[u8]>>(message: M, signature: &[u8], public_key: &[u8]) -> CryptoResult<bool> {
        check_len(Self::ALGORITHM, KeyMaterial::Signature, Self::SIGNATURE_BYTES, signature)?;
        check_len(Self::ALGORITHM, KeyMaterial::PublicKey, Self::PUBLIC_KEY_BYTES, public_key)?;

        let valid = Self::raw_verify(message.as_ref(), signature, public_key);
        if !valid {
            log::debug!("{} signature did not verify", Self::ALGORITHM);
        }
        Ok(valid)
    }

    /// Diagnostic round trip: fresh keypair, sign `message`, verify it.
    fn perform_sign_and_verify<M: AsRef<[u8]>>(message: M) -> CryptoResult<bool> {
        let pair = Self::generate_keypair()?;
        let signature = Self::sign(message.as_ref(), &pair.secret_key)?;
        Self::verify(message.as_ref(), &signature, &pair.public_key)
    }
}
