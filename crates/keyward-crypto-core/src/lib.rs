//! `keyward-crypto-core`: pure cryptographic primitives for Keyward.
//!
//! This crate is the audit target: zero network, zero async, zero storage.
//! Everything here is a pure function of its inputs, so callers may run
//! derivations and AEAD operations concurrently across requests.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod symmetric;

pub mod credential;

pub mod search;

pub use credential::{ServiceCredentials, ServiceToken, SIGNING_KEY_MIN_LEN};
pub use error::CryptoError;
pub use kdf::{
    DerivationStrategy, KeyDeriver, KeyMaterial, DERIVED_KEY_LEN, HKDF_ZERO_SALT,
    PBKDF2_ITERATIONS,
};
pub use memory::{disable_core_dumps, SecretBuffer, SecretBytes};
pub use search::{search, SearchOutcome, SearchTarget};
pub use symmetric::{decrypt, encrypt, generate_nonce, open, seal, SealedData};
