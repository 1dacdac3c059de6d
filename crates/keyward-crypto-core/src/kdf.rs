//! Key derivation strategies for vault encryption keys.
//!
//! This module provides:
//! - [`DerivationStrategy`]: the three interoperable schemes, persisted with
//!   every vault record so decryption never has to guess
//! - [`KeyMaterial`]: process-wide secrets (shared secret, static key),
//!   loaded once at startup
//! - [`KeyDeriver`]: binds a strategy to the right input: the caller's
//!   password or the configured [`KeyMaterial`]
//!
//! # Schemes
//!
//! | Strategy | Input | Salt | Context |
//! |---|---|---|---|
//! | `pbkdf2-sha256` | user password | wallet identity | ignored |
//! | `hkdf-sha256` | shared secret | 16 zero bytes | HKDF info (empty) |
//! | `static-key` | first 32 bytes of raw key | ignored | ignored |

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, SecretBytes};
use ring::hkdf;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Length of every derived key in bytes (256 bits).
pub const DERIVED_KEY_LEN: usize = 32;

/// PBKDF2 iteration count used by every password-protected vault on record.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// HKDF salt used for shared-secret vaults.
pub const HKDF_ZERO_SALT: [u8; 16] = [0u8; 16];

/// Requests a 32-byte output from `ring::hkdf::Prk::expand`.
struct HkdfLen32;

impl hkdf::KeyType for HkdfLen32 {
    fn len(&self) -> usize {
        DERIVED_KEY_LEN
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How a vault's AES key is obtained. Chosen once at vault creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scheme")]
pub enum DerivationStrategy {
    /// PBKDF2-HMAC-SHA256 over a user password.
    #[serde(rename = "pbkdf2-sha256")]
    Pbkdf2Sha256 {
        /// PRF iteration count.
        iterations: u32,
    },
    /// HKDF-SHA256 extract-and-expand over the shared application secret.
    #[serde(rename = "hkdf-sha256")]
    HkdfSha256,
    /// Raw pre-shared key, truncated to 32 bytes, no derivation.
    #[serde(rename = "static-key")]
    StaticKey,
}

impl DerivationStrategy {
    /// PBKDF2 with the standard iteration count.
    #[must_use]
    pub const fn password() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Stable identifier stored in the `kdf` column.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "pbkdf2-sha256",
            Self::HkdfSha256 => "hkdf-sha256",
            Self::StaticKey => "static-key",
        }
    }

    /// Iteration count, for strategies that have one.
    #[must_use]
    pub const fn iterations(&self) -> Option<u32> {
        match self {
            Self::Pbkdf2Sha256 { iterations } => Some(*iterations),
            Self::HkdfSha256 | Self::StaticKey => None,
        }
    }

    /// Rebuild a strategy from its stored identifier and parameters.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDerivation` for an unknown identifier or a
    /// PBKDF2 record without an iteration count.
    pub fn from_id(id: &str, iterations: Option<u32>) -> Result<Self, CryptoError> {
        match id {
            "pbkdf2-sha256" => iterations
                .map(|iterations| Self::Pbkdf2Sha256 { iterations })
                .ok_or_else(|| {
                    CryptoError::KeyDerivation("pbkdf2-sha256 record lacks iterations".into())
                }),
            "hkdf-sha256" => Ok(Self::HkdfSha256),
            "static-key" => Ok(Self::StaticKey),
            other => Err(CryptoError::KeyDerivation(format!(
                "unknown derivation strategy: {other}"
            ))),
        }
    }

    /// Derive a 256-bit key. Same arguments always give the same key.
    ///
    /// An empty `input` is accepted by PBKDF2 and HKDF.
    ///
    /// # Errors
    ///
    /// - `CryptoError::KeyDerivation` for a zero PBKDF2 iteration count
    /// - `CryptoError::InvalidKeyLength` when a static key is shorter than 32 bytes
    pub fn derive(
        &self,
        input: &[u8],
        salt: &[u8],
        context: &[u8],
    ) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
        match self {
            Self::Pbkdf2Sha256 { iterations } => derive_pbkdf2(input, salt, *iterations),
            Self::HkdfSha256 => derive_hkdf(input, salt, context),
            Self::StaticKey => {
                let truncated = input.get(..DERIVED_KEY_LEN).unwrap_or(input);
                SecretBytes::from_slice(truncated)
            }
        }
    }
}

impl fmt::Display for DerivationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbkdf2Sha256 { iterations } => write!(f, "pbkdf2-sha256 ({iterations} rounds)"),
            other => f.write_str(other.id()),
        }
    }
}

fn derive_pbkdf2(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "pbkdf2 iteration count must be non-zero".into(),
        ));
    }
    let mut output = [0u8; DERIVED_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, iterations, &mut output);
    let key = SecretBytes::new(output);
    output.zeroize();
    Ok(key)
}

fn derive_hkdf(
    secret: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(secret);
    let info = [info];
    let okm = prk
        .expand(&info, HkdfLen32)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".into()))?;

    let mut output = [0u8; DERIVED_KEY_LEN];
    okm.fill(&mut output)
        .map_err(|_| CryptoError::KeyDerivation("HKDF fill failed".into()))?;
    let key = SecretBytes::new(output);
    output.zeroize();
    Ok(key)
}

// ---------------------------------------------------------------------------
// Configured key material
// ---------------------------------------------------------------------------

/// Process-wide secrets for the non-password strategies.
///
/// Built from configuration at startup and handed to [`KeyDeriver::new`];
/// nothing in this crate reads secrets from ambient state.
#[derive(Default)]
pub struct KeyMaterial {
    shared_secret: Option<SecretBuffer>,
    static_key: Option<SecretBuffer>,
}

impl KeyMaterial {
    /// Empty material: only password vaults can be opened.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the shared secret used by `hkdf-sha256`.
    #[must_use]
    pub fn with_shared_secret(mut self, secret: SecretBuffer) -> Self {
        self.shared_secret = Some(secret);
        self
    }

    /// Attach the raw key used by `static-key`.
    #[must_use]
    pub fn with_static_key(mut self, key: SecretBuffer) -> Self {
        self.static_key = Some(key);
        self
    }

    /// Whether a shared secret is configured.
    #[must_use]
    pub const fn has_shared_secret(&self) -> bool {
        self.shared_secret.is_some()
    }

    /// Whether a static key is configured.
    #[must_use]
    pub const fn has_static_key(&self) -> bool {
        self.static_key.is_some()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("shared_secret", &self.has_shared_secret())
            .field("static_key", &self.has_static_key())
            .finish()
    }
}

/// Resolves the input for a strategy and runs the derivation.
#[derive(Debug, Default)]
pub struct KeyDeriver {
    material: KeyMaterial,
}

impl KeyDeriver {
    /// Bind a deriver to the configured key material.
    #[must_use]
    pub const fn new(material: KeyMaterial) -> Self {
        Self { material }
    }

    /// The configured material.
    #[must_use]
    pub const fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Derive the key for `strategy`.
    ///
    /// `password` is required for `pbkdf2-sha256` and ignored otherwise; the
    /// other strategies read their input from [`KeyMaterial`].
    ///
    /// # Errors
    ///
    /// - `CryptoError::KeyMaterialUnavailable` when the required input is missing
    /// - any error from [`DerivationStrategy::derive`]
    pub fn derive(
        &self,
        strategy: &DerivationStrategy,
        password: Option<&[u8]>,
        salt: &[u8],
        context: &[u8],
    ) -> Result<SecretBytes<DERIVED_KEY_LEN>, CryptoError> {
        let input = match strategy {
            DerivationStrategy::Pbkdf2Sha256 { .. } => password.ok_or_else(|| {
                CryptoError::KeyMaterialUnavailable("password required".into())
            })?,
            DerivationStrategy::HkdfSha256 => self
                .material
                .shared_secret
                .as_ref()
                .map(SecretBuffer::expose)
                .ok_or_else(|| {
                    CryptoError::KeyMaterialUnavailable("shared secret not configured".into())
                })?,
            DerivationStrategy::StaticKey => self
                .material
                .static_key
                .as_ref()
                .map(SecretBuffer::expose)
                .ok_or_else(|| {
                    CryptoError::KeyMaterialUnavailable("static key not configured".into())
                })?,
        };
        strategy.derive(input, salt, context)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
