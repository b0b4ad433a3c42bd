//! Post-Quantum Primitives
//!
//! Orchestration around vetted primitives. No lattice math lives here.
//!
//! ## Structure
//! - `kem`: `KeyEncapsulation` contract + runtime parameter-set selection
//! - `kyber1024`: legacy parameter set
//! - `mlkem1024`: FIPS 203 parameter set
//! - `signature`: `DigitalSignature` contract
//! - `mldsa87`: FIPS 204 parameter set
//! - `types`: key pairs, encapsulation results, fingerprints
//!
//! All operations are stateless and safe to call from any thread.

pub mod kem;
pub mod kyber1024;
pub mod mldsa87;
pub mod mlkem1024;
pub mod signature;
pub mod types;

pub use self::kem::{KemParameterSet, KeyEncapsulation};
pub use self::kyber1024::Kyber1024;
pub use self::mldsa87::MlDsa87;
pub use self::mlkem1024::MlKem1024;
pub use self::signature::DigitalSignature;
pub use self::types::{fingerprint, EncapsulationResult, KeyPair, SharedSecret, Signature};
