//! The decrypt pipeline: authorize, load, derive, open.

use keyward_crypto_core::kdf::{DerivationStrategy, KeyDeriver};
use keyward_crypto_core::symmetric;
use rusqlite::Connection;
use secrecy::{ExposeSecret, SecretString};

use crate::access::{AccessGate, AccessRequest, Caller, SessionResolver};
use crate::encoding::decode_field;
use crate::error::VaultError;
use crate::store::get_vault_record;

/// One decrypt call.
///
/// `ciphertext` and `nonce` are hex or base64 (see [`crate::encoding`]).
/// A privileged caller may substitute other bytes; an end user's values
/// must equal the stored ones. The vault's persisted strategy is used
/// either way.
#[derive(Debug, Default)]
pub struct DecryptRequest {
    pub vault_id: String,
    pub ciphertext: Option<String>,
    pub nonce: Option<String>,
    /// Required for `pbkdf2-sha256` vaults, ignored otherwise.
    pub password: Option<SecretString>,
    pub session: Option<String>,
    pub service_token: Option<String>,
}

impl DecryptRequest {
    fn access(&self) -> AccessRequest<'_> {
        AccessRequest {
            session: self.session.as_deref(),
            service_token: self.service_token.as_deref(),
        }
    }
}

/// Decrypt the private key held by `request.vault_id`.
///
/// Steps, in order: identify the caller, load the vault, check ownership
/// and strategy policy, decode any overrides, derive the key, open.
///
/// # Errors
///
/// - [`VaultError::Unauthorized`] from the gate, or when an end user's
///   `ciphertext`/`nonce` differ from the stored vault.
/// - [`VaultError::NotFound`] for an unknown vault.
/// - [`VaultError::MalformedInput`] for undecodable overrides, a missing
///   password, or a plaintext that is not UTF-8.
/// - [`VaultError::Crypto`] when derivation or authentication fails.
pub fn decrypt_vault<S: SessionResolver>(
    conn: &Connection,
    gate: &AccessGate<S>,
    deriver: &KeyDeriver,
    request: &DecryptRequest,
    now: u64,
) -> Result<SecretString, VaultError> {
    let caller = gate.authorize(&request.access(), now)?;
    let record = get_vault_record(conn, &request.vault_id)?;
    gate.check_decrypt(&caller, &record)?;

    let ciphertext = resolve_field(
        &caller,
        "ciphertext",
        request.ciphertext.as_deref(),
        &record.ciphertext,
    )?;
    let nonce = resolve_field(&caller, "nonce", request.nonce.as_deref(), &record.nonce)?;

    let password = request
        .password
        .as_ref()
        .map(|p| p.expose_secret().as_bytes());
    if matches!(record.strategy, DerivationStrategy::Pbkdf2Sha256 { .. }) && password.is_none() {
        return Err(VaultError::MalformedInput("password is required".into()));
    }

    let key = deriver.derive(
        &record.strategy,
        password,
        &record.kdf_salt,
        &record.kdf_context,
    )?;
    let plaintext = symmetric::open(key.expose(), &nonce, &ciphertext)?;

    let text = std::str::from_utf8(plaintext.expose())
        .map_err(|_| VaultError::MalformedInput("decrypted key is not valid UTF-8".into()))?;

    tracing::info!(
        vault_id = %record.id,
        caller = caller.kind(),
        strategy = %record.strategy,
        "vault decrypted"
    );

    Ok(SecretString::from(text.to_owned()))
}

/// Decoded request value for `field`, or the stored bytes when absent.
///
/// End users may only echo the stored bytes: every `hkdf-sha256` vault is
/// sealed under the same key.
fn resolve_field(
    caller: &Caller,
    field: &str,
    supplied: Option<&str>,
    stored: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let Some(text) = supplied else {
        return Ok(stored.to_vec());
    };
    let bytes = decode_field(field, text)?;
    if matches!(caller, Caller::EndUser(_)) && bytes != stored {
        tracing::warn!(field, caller = caller.kind(), "rejected foreign decrypt input");
        return Err(VaultError::Unauthorized);
    }
    Ok(bytes)
}
