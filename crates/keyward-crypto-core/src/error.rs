//! Cryptographic error types for `keyward-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key, nonce, or ciphertext has the wrong size or encoding. Raised
    /// before any input reaches the AES-256-GCM primitive.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Authentication tag verification failed. A wrong key, a wrong nonce and
    /// corrupted ciphertext all land here.
    #[error("decryption failed: authentication tag mismatch")]
    AuthenticationFailure,

    /// Key material is not exactly 256 bits after truncation or derivation.
    #[error("invalid key length: {0} bytes (expected 32)")]
    InvalidKeyLength(usize),

    /// Key derivation failed (invalid parameters).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The strategy needs an input (password, shared secret, static key)
    /// that was neither configured nor supplied.
    #[error("key material unavailable: {0}")]
    KeyMaterialUnavailable(String),

    /// Service credential was malformed, expired, or failed verification.
    #[error("invalid service credential")]
    InvalidCredential,

    /// Secure memory allocation failure (CSPRNG, mlock).
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
