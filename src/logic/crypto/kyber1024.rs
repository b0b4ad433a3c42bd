//! Kyber-1024 (legacy parameter set)
//!
//! NIST round-3 Kyber from `pqcrypto-kyber` 0.7. Key and ciphertext sizes
//! match ML-KEM-1024 but the shared-secret derivation does not, so the two
//! sets never agree on a secret.

use pqcrypto_kyber::kyber1024;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use zeroize::Zeroizing;

use crate::logic::error::{CryptoError, CryptoResult};

use super::kem::KeyEncapsulation;
use super::types::{EncapsulationResult, KeyPair, SharedSecret};

#[derive(Debug, Clone, Copy, Default)]
pub struct Kyber1024;

impl KeyEncapsulation for Kyber1024 {
    const ALGORITHM: &'static str = "Kyber-1024";
    const PUBLIC_KEY_BYTES: usize = 1568;
    const SECRET_KEY_BYTES: usize = 3168;
    const CIPHERTEXT_BYTES: usize = 1568;
    const SHARED_SECRET_BYTES: usize = 32;

    fn raw_generate_keypair() -> CryptoResult<KeyPair> {
        let (pk, sk) = kyber1024::keypair();
        Ok(KeyPair::new(pk.as_bytes().to_vec(), sk.as_bytes().to_vec()))
    }

    fn raw_encapsulate(public_key: &[u8]) -> CryptoResult<EncapsulationResult> {
        let pk = kyber1024::PublicKey::from_bytes(public_key).map_err(|e| {
            CryptoError::EncapsulationFailure {
                algorithm: Self::ALGORITHM,
                reason: format!("{:?}", e),
            }
        })?;

        let (ss, ct) = kyber1024::encapsulate(&pk);
        Ok(EncapsulationResult::new(ct.as_bytes().to_vec(), ss.as_bytes().to_vec()))
    }

    fn raw_decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> CryptoResult<SharedSecret> {
        let decap_err = |e: pqcrypto_traits::Error| CryptoError::DecapsulationFailure {
            algorithm: Self::ALGORITHM,
            reason: format!("{:?}", e),
        };

        let sk = kyber1024::SecretKey::from_bytes(secret_key).map_err(decap_err)?;
        let ct = kyber1024::Ciphertext::from_bytes(ciphertext).map_err(decap_err)?;

        let ss = kyber1024::decapsulate(&ct, &sk);
        Ok(Zeroizing::new(ss.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::KeyMaterial;

    #[test]
    fn test_sizes_match_backend() {
        assert_eq!(Kyber1024::PUBLIC_KEY_BYTES, kyber1024::public_key_bytes());
        assert_eq!(Kyber1024::SECRET_KEY_BYTES, kyber1024::secret_key_bytes());
        assert_eq!(Kyber1024::CIPHERTEXT_BYTES, kyber1024::ciphertext_bytes());
        assert_eq!(Kyber1024::SHARED_SECRET_BYTES, kyber1024::shared_secret_bytes());
    }

    #[test]
    fn test_round_trip() {
        let pair = Kyber1024::generate_keypair().unwrap();
        assert_eq!(pair.public_key.len(), Kyber1024::PUBLIC_KEY_BYTES);
        assert_eq!(pair.secret_key.len(), Kyber1024::SECRET_KEY_BYTES);

        let result = Kyber1024::encapsulate(&pair.public_key).unwrap();
        assert_eq!(result.ciphertext.len(), Kyber1024::CIPHERTEXT_BYTES);

        let secret = Kyber1024::decapsulate(&result.ciphertext, &pair.secret_key).unwrap();
        assert_eq!(secret.len(), Kyber1024::SHARED_SECRET_BYTES);
        assert_eq!(*secret, *result.shared_secret);
    }

    #[test]
    fn test_key_exchange_secrets_match() {
        let (client, server) = Kyber1024::perform_key_exchange().unwrap();
        assert_eq!(*client, *server);
    }

    #[test]
    fn test_wrong_secret_key_yields_different_secret() {
        let alice = Kyber1024::generate_keypair().unwrap();
        let mallory = Kyber1024::generate_keypair().unwrap();

        let result = Kyber1024::encapsulate(&alice.public_key).unwrap();
        let wrong = Kyber1024::decapsulate(&result.ciphertext, &mallory.secret_key).unwrap();
        assert_ne!(*wrong, *result.shared_secret);
    }

    #[test]
    fn test_not_interchangeable_with_fips203() {
        use crate::logic::crypto::MlKem1024;

        let legacy = Kyber1024::generate_keypair().unwrap();
        let result = MlKem1024::encapsulate(&legacy.public_key).unwrap();
        let secret = Kyber1024::decapsulate(&result.ciphertext, &legacy.secret_key).unwrap();
        assert_eq!(secret.len(), result.shared_secret.len());
        assert_ne!(*secret, *result.shared_secret);

        let fips = MlKem1024::generate_keypair().unwrap();
        let result = Kyber1024::encapsulate(&fips.public_key).unwrap();
        let secret = MlKem1024::decapsulate(&result.ciphertext, &fips.secret_key).unwrap();
        assert_ne!(*secret, *result.shared_secret);
    }

    #[test]
    fn test_100_byte_public_key_rejected() {
        let err = Kyber1024::encapsulate(&[0u8; 100]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyMaterial {
                algorithm: "Kyber-1024",
                material: KeyMaterial::PublicKey,
                expected: 1568,
                actual: 100,
            }
        );
    }

    #[test]
    fn test_bad_decapsulation_inputs_rejected() {
        let pair = Kyber1024::generate_keypair().unwrap();
        let result = Kyber1024::encapsulate(&pair.public_key).unwrap();

        let err = Kyber1024::decapsulate(&result.ciphertext[..1000], &pair.secret_key).unwrap_err();
        assert!(err.is_invalid_key_material());

        let mut long_sk = pair.secret_key.clone();
        long_sk.push(0);
        let err = Kyber1024::decapsulate(&result.ciphertext, &long_sk).unwrap_err();
        assert!(err.is_invalid_key_material());
    }
}
