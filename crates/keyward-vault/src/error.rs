//! Vault error types for `keyward-vault`.

use keyward_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Caller is not authenticated, does not own the resource, or may not
    /// use the vault's derivation strategy.
    #[error("unauthorized")]
    Unauthorized,

    /// Wallet or vault not found by ID.
    #[error("not found: {0}")]
    NotFound(String),

    /// The wallet already has a vault.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request field could not be decoded or is out of range.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// `SQLite` error.
    #[error("database error: {0}")]
    Database(String),

    /// Migration error during schema upgrade.
    #[error("migration error: {0}")]
    Migration(String),

    /// Configuration file or environment override is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// HTTP-style status for callers that speak the decrypt contract.
    ///
    /// `401` unauthorized, `400` malformed input, `404` unknown wallet or
    /// vault, `409` conflict, `500` for everything else including failed
    /// authentication of the ciphertext.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::MalformedInput(_) | Self::Crypto(CryptoError::MalformedInput(_)) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Crypto(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Config(_)
            | Self::Io(_) => 500,
        }
    }

    /// Message safe to hand back to an untrusted caller.
    ///
    /// Cryptographic failures collapse to `"decryption failed"` and storage
    /// failures to `"internal error"`; neither carries the underlying cause.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => "unauthorized".into(),
            Self::MalformedInput(msg) | Self::Crypto(CryptoError::MalformedInput(msg)) => {
                format!("malformed input: {msg}")
            }
            Self::NotFound(what) => format!("not found: {what}"),
            Self::Conflict(msg) => format!("conflict: {msg}"),
            Self::Crypto(_) => "decryption failed".into(),
            Self::Database(_) | Self::Migration(_) | Self::Config(_) | Self::Io(_) => {
                "internal error".into()
            }
        }
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref ffi_err, _) = err {
            if ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return Self::Conflict(err.to_string());
            }
        }
        Self::Database(err.to_string())
    }
}
