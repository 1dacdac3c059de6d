//! AES-256-GCM authenticated encryption of wallet private keys.
//!
//! This module provides:
//! - [`seal`] / [`open`]: encrypt/decrypt under a caller-supplied nonce
//! - [`encrypt`] / [`decrypt`]: the same, with a fresh random nonce carried
//!   in [`SealedData`]
//! - [`generate_nonce`]: 96-bit nonce from the OS CSPRNG
//!
//! Ciphertexts use the `ciphertext || tag` layout and no associated data, so
//! records written by earlier importers stay readable. Every size check runs
//! before `ring` sees the input; anything that reaches the primitive and fails
//! is reported as [`CryptoError::AuthenticationFailure`] and nothing else.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Nonce plus `ciphertext || tag`, as persisted in a vault record.
#[must_use = "encrypted data must be stored or transmitted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedData {
    /// 96-bit nonce, unique per encryption under a given key.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 16-byte GCM tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedData {
    /// Build from raw parts, validating the sizes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedInput` if the nonce is not 12 bytes or
    /// the ciphertext cannot hold a tag.
    pub fn from_parts(nonce: &[u8], ciphertext: &[u8]) -> Result<Self, CryptoError> {
        let nonce = nonce_array(nonce)?;
        check_ciphertext(ciphertext)?;
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Core operations
// ---------------------------------------------------------------------------

/// Draw a 96-bit nonce from `OsRng`.
#[must_use]
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` and `nonce`, returning `ciphertext || tag`.
///
/// Uniqueness of `nonce` under `key` is the caller's responsibility; use
/// [`encrypt`] unless the nonce is dictated from outside.
///
/// # Errors
///
/// Returns `CryptoError::MalformedInput` if the key is not 32 bytes or the
/// nonce is not 12 bytes.
pub fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let sealing_key = aes_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_array(nonce)?);

    let mut in_out = plaintext.to_vec();
    if sealing_key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::MalformedInput(
            "plaintext too large for AES-256-GCM".into(),
        ));
    }
    Ok(in_out)
}

/// Decrypt and authenticate `ciphertext || tag`.
///
/// # Errors
///
/// - `CryptoError::MalformedInput` for a key that is not 32 bytes, a nonce
///   that is not 12 bytes, or a ciphertext shorter than the tag
/// - `CryptoError::AuthenticationFailure` when the tag does not verify
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<SecretBuffer, CryptoError> {
    let opening_key = aes_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_array(nonce)?);
    check_ciphertext(ciphertext)?;

    let mut in_out = ciphertext.to_vec();
    let result = match opening_key.open_in_place(nonce, aead::Aad::empty(), &mut in_out) {
        Ok(plaintext) => Ok(SecretBuffer::new(plaintext)),
        Err(_) => Err(CryptoError::AuthenticationFailure),
    };
    in_out.zeroize();
    result
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// Returns `CryptoError::MalformedInput` if the key is not 32 bytes.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<SealedData, CryptoError> {
    let nonce = generate_nonce();
    let ciphertext = seal(key, &nonce, plaintext)?;
    Ok(SealedData { nonce, ciphertext })
}

/// Decrypt a [`SealedData`] produced by [`encrypt`].
///
/// # Errors
///
/// Same as [`open`].
pub fn decrypt(sealed: &SealedData, key: &[u8]) -> Result<SecretBuffer, CryptoError> {
    open(key, &sealed.nonce, &sealed.ciphertext)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn aes_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::MalformedInput(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::MalformedInput("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

fn nonce_array(nonce: &[u8]) -> Result<[u8; NONCE_LEN], CryptoError> {
    <[u8; NONCE_LEN]>::try_from(nonce).map_err(|_| {
        CryptoError::MalformedInput(format!(
            "invalid nonce length: {} bytes (expected {NONCE_LEN})",
            nonce.len()
        ))
    })
}

fn check_ciphertext(ciphertext: &[u8]) -> Result<(), CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::MalformedInput(format!(
            "ciphertext too short: {} bytes (minimum {TAG_LEN})",
            ciphertext.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
