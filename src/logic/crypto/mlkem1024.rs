//! ML-KEM-1024 (FIPS 203)

use ::kem::{Decapsulate, Encapsulate};
use ml_kem::kem::{DecapsulationKey, EncapsulationKey};
use ml_kem::{EncodedSizeUser, KemCore, MlKem1024 as MlKem1024Core, MlKem1024Params};
use zeroize::Zeroizing;

use crate::logic::error::{CryptoError, CryptoResult};

use super::kem::KeyEncapsulation;
use super::types::{EncapsulationResult, KeyPair, SharedSecret};

const CIPHERTEXT_SIZE: usize = 1568;

#[derive(Debug, Clone, Copy, Default)]
pub struct MlKem1024;

impl KeyEncapsulation for MlKem1024 {
    const ALGORITHM: &'static str = "ML-KEM-1024";
    const PUBLIC_KEY_BYTES: usize = 1568;
    const SECRET_KEY_BYTES: usize = 3168;
    const CIPHERTEXT_BYTES: usize = CIPHERTEXT_SIZE;
    const SHARED_SECRET_BYTES: usize = 32;

    fn raw_generate_keypair() -> CryptoResult<KeyPair> {
        let mut rng = rand::thread_rng();
        let (dk, ek): (DecapsulationKey<MlKem1024Params>, EncapsulationKey<MlKem1024Params>) =
            MlKem1024Core::generate(&mut rng);

        let ek_bytes = EncodedSizeUser::as_bytes(&ek).to_vec();
        let dk_bytes = EncodedSizeUser::as_bytes(&dk).to_vec();
        Ok(KeyPair::new(ek_bytes, dk_bytes))
    }

    fn raw_encapsulate(public_key: &[u8]) -> CryptoResult<EncapsulationResult> {
        let encap_err = |reason: &str| CryptoError::EncapsulationFailure {
            algorithm: Self::ALGORITHM,
            reason: reason.to_string(),
        };

        let ek_array: ml_kem::Encoded<EncapsulationKey<MlKem1024Params>> = public_key
            .try_into()
            .map_err(|_| encap_err("public key does not decode"))?;
        let ek = EncapsulationKey::<MlKem1024Params>::from_bytes(&ek_array);

        let mut rng = rand::thread_rng();
        let (ct, ss) = ek
            .encapsulate(&mut rng)
            .map_err(|_| encap_err("primitive rejected the public key"))?;

        Ok(EncapsulationResult::new(ct.as_slice().to_vec(), ss.as_slice().to_vec()))
    }

    fn raw_decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> CryptoResult<SharedSecret> {
        let decap_err = |reason: &str| CryptoError::DecapsulationFailure {
            algorithm: Self::ALGORITHM,
            reason: reason.to_string(),
        };

        let dk_array: ml_kem::Encoded<DecapsulationKey<MlKem1024Params>> = secret_key
            .try_into()
            .map_err(|_| decap_err("secret key does not decode"))?;
        let dk = DecapsulationKey::<MlKem1024Params>::from_bytes(&dk_array);

        let ct_array: [u8; CIPHERTEXT_SIZE] = ciphertext
            .try_into()
            .map_err(|_| decap_err("ciphertext does not decode"))?;
        let ct = ml_kem::array::Array::from(ct_array);

        let ss = dk
            .decapsulate(&ct)
            .map_err(|_| decap_err("primitive rejected the ciphertext"))?;

        Ok(Zeroizing::new(ss.as_slice().to_vec()))
    }
}
