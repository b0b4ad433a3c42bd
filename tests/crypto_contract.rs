//! Size contract and round trips across every parameter set, through the
//! public API only.

use countermeasure_core::logic::crypto::KemParameterSet;
use countermeasure_core::prelude::*;
use countermeasure_core::{CryptoError, KeyMaterial};

fn assert_kem_contract<K: KeyEncapsulation>() {
    let pair = K::generate_keypair().unwrap();
    assert_eq!(pair.public_key.len(), K::PUBLIC_KEY_BYTES);
    assert_eq!(pair.secret_key.len(), K::SECRET_KEY_BYTES);

    let result = K::encapsulate(&pair.public_key).unwrap();
    assert_eq!(result.ciphertext.len(), K::CIPHERTEXT_BYTES);
    assert_eq!(result.shared_secret.len(), K::SHARED_SECRET_BYTES);

    let secret = K::decapsulate(&result.ciphertext, &pair.secret_key).unwrap();
    assert_eq!(*secret, *result.shared_secret);

    for bad_len in [0, 100, K::PUBLIC_KEY_BYTES - 1, K::PUBLIC_KEY_BYTES + 1] {
        let err = K::encapsulate(&vec![0u8; bad_len]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyMaterial {
                algorithm: K::ALGORITHM,
                material: KeyMaterial::PublicKey,
                expected: K::PUBLIC_KEY_BYTES,
                actual: bad_len,
            }
        );
    }

    let err = K::decapsulate(&result.ciphertext[1..], &pair.secret_key).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidKeyMaterial {
            material: KeyMaterial::Ciphertext,
            ..
        }
    ));

    let err = K::decapsulate(&result.ciphertext, &pair.secret_key[1..]).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidKeyMaterial {
            material: KeyMaterial::SecretKey,
            ..
        }
    ));
}

#[test]
fn kyber1024_honours_contract() {
    assert_kem_contract::<Kyber1024>();
}

#[test]
fn mlkem1024_honours_contract() {
    assert_kem_contract::<MlKem1024>();
}

#[test]
fn runtime_selection_matches_static_sets() {
    assert_eq!(KemParameterSet::Legacy.algorithm(), Kyber1024::ALGORITHM);
    assert_eq!(KemParameterSet::Fips203.algorithm(), MlKem1024::ALGORITHM);

    for set in KemParameterSet::ALL {
        let pair = set.generate_keypair().unwrap();
        assert_eq!(pair.public_key.len(), set.public_key_bytes());
        let result = set.encapsulate(&pair.public_key).unwrap();
        let secret = set.decapsulate(&result.ciphertext, &pair.secret_key).unwrap();
        assert_eq!(*secret, *result.shared_secret);
    }
}

#[test]
fn parameter_sets_do_not_interoperate_silently() {
    // a legacy key has the right size for ML-KEM, so every call succeeds, but
    // the secrets on the two sides never agree
    for _ in 0..3 {
        let legacy = Kyber1024::generate_keypair().unwrap();
        let result = MlKem1024::encapsulate(&legacy.public_key).unwrap();
        let secret = Kyber1024::decapsulate(&result.ciphertext, &legacy.secret_key).unwrap();
        assert_ne!(*secret, *result.shared_secret);
    }
}

#[test]
fn kem_is_usable_from_many_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let (client, server) = MlKem1024::perform_key_exchange().unwrap();
                assert_eq!(*client, *server);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn mldsa87_sign_verify_contract() {
    let pair = MlDsa87::generate_keypair().unwrap();
    assert_eq!(pair.public_key.len(), MlDsa87::PUBLIC_KEY_BYTES);
    assert_eq!(pair.secret_key.len(), MlDsa87::SECRET_KEY_BYTES);

    let signature = MlDsa87::sign(b"payload", &pair.secret_key).unwrap();
    assert_eq!(signature.len(), MlDsa87::SIGNATURE_BYTES);
    assert!(MlDsa87::verify(b"payload", &signature, &pair.public_key).unwrap());
    assert!(!MlDsa87::verify(b"payload!", &signature, &pair.public_key).unwrap());

    let zeros = vec![0u8; MlDsa87::SIGNATURE_BYTES];
    assert!(!MlDsa87::verify(b"payload", &zeros, &pair.public_key).unwrap());

    assert!(MlDsa87::verify(b"payload", &signature[..10], &pair.public_key)
        .unwrap_err()
        .is_invalid_key_material());
    assert!(MlDsa87::sign(b"payload", &[]).unwrap_err().is_invalid_key_material());
}
