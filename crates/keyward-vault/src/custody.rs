//! Sealing private keys into vaults, and re-sealing them under a new key.

use keyward_crypto_core::kdf::{DerivationStrategy, KeyDeriver, HKDF_ZERO_SALT};
use keyward_crypto_core::symmetric;
use rusqlite::Connection;
use secrecy::{ExposeSecret, SecretString};

use crate::error::VaultError;
use crate::store::{
    create_vault_record, delete_vault_record, ensure_wallet_owner, get_vault_record,
    NewVaultRecord, VaultRecord,
};

/// How the vault key for an imported private key is obtained.
#[derive(Debug)]
pub enum ImportMethod {
    /// PBKDF2 over a user password, salted with the wallet ID.
    Password(SecretString),
    /// HKDF over the configured shared secret.
    SharedSecret,
    /// The configured static key, used as-is.
    StaticKey,
}

impl ImportMethod {
    /// Strategy that will be persisted with the vault.
    #[must_use]
    pub const fn strategy(&self) -> DerivationStrategy {
        match self {
            Self::Password(_) => DerivationStrategy::password(),
            Self::SharedSecret => DerivationStrategy::HkdfSha256,
            Self::StaticKey => DerivationStrategy::StaticKey,
        }
    }

    fn password(&self) -> Option<&[u8]> {
        match self {
            Self::Password(p) => Some(p.expose_secret().as_bytes()),
            Self::SharedSecret | Self::StaticKey => None,
        }
    }

    fn salt(&self, wallet_id: &str) -> Vec<u8> {
        match self {
            Self::Password(_) => wallet_id.as_bytes().to_vec(),
            Self::SharedSecret => HKDF_ZERO_SALT.to_vec(),
            Self::StaticKey => Vec::new(),
        }
    }
}

/// A private key to seal for a wallet the user already owns.
#[derive(Debug)]
pub struct ImportRequest {
    pub user_id: String,
    pub wallet_id: String,
    pub private_key: SecretString,
    pub method: ImportMethod,
}

/// Seal `request.private_key` and persist it as the wallet's vault.
///
/// # Errors
///
/// - [`VaultError::MalformedInput`] for an empty private key.
/// - [`VaultError::NotFound`] / [`VaultError::Unauthorized`] when the wallet
///   is missing or owned by another user.
/// - [`VaultError::Conflict`] if the wallet already has a vault.
/// - [`VaultError::Crypto`] if the required key material is not configured.
pub fn import_private_key(
    conn: &Connection,
    deriver: &KeyDeriver,
    request: &ImportRequest,
) -> Result<VaultRecord, VaultError> {
    let private_key = request.private_key.expose_secret().trim();
    if private_key.is_empty() {
        return Err(VaultError::MalformedInput("private key is empty".into()));
    }
    ensure_wallet_owner(conn, &request.user_id, &request.wallet_id)?;

    let new = seal_for_wallet(
        deriver,
        &request.user_id,
        &request.wallet_id,
        private_key.as_bytes(),
        &request.method,
    )?;
    let record = create_vault_record(conn, &new)?;

    tracing::info!(
        vault_id = %record.id,
        wallet_id = %record.wallet_id,
        strategy = %record.strategy,
        "private key imported"
    );
    Ok(record)
}

/// Re-seal a vault under `new_method`.
///
/// The old record is opened with its persisted strategy (`old_password` is
/// needed only for `pbkdf2-sha256`), then deleted and replaced inside one
/// transaction. The replacement always gets a fresh nonce and a new vault ID.
///
/// # Errors
///
/// - [`VaultError::NotFound`] for an unknown vault.
/// - [`VaultError::MalformedInput`] if the old vault needs a password and
///   none was given.
/// - [`VaultError::Crypto`] if the old vault cannot be opened or the new
///   key material is not configured.
/// - [`VaultError::Database`] if the swap fails; the old vault is kept.
pub fn rotate_vault(
    conn: &Connection,
    deriver: &KeyDeriver,
    vault_id: &str,
    old_password: Option<&SecretString>,
    new_method: &ImportMethod,
) -> Result<VaultRecord, VaultError> {
    let old = get_vault_record(conn, vault_id)?;

    let password = old_password.map(|p| p.expose_secret().as_bytes());
    if matches!(old.strategy, DerivationStrategy::Pbkdf2Sha256 { .. }) && password.is_none() {
        return Err(VaultError::MalformedInput("current password is required".into()));
    }
    let old_key = deriver.derive(&old.strategy, password, &old.kdf_salt, &old.kdf_context)?;
    let plaintext = symmetric::open(old_key.expose(), &old.nonce, &old.ciphertext)?;

    let new = seal_for_wallet(
        deriver,
        &old.user_id,
        &old.wallet_id,
        plaintext.expose(),
        new_method,
    )?;

    let tx = conn.unchecked_transaction()?;
    delete_vault_record(&tx, &old.id)?;
    let record = create_vault_record(&tx, &new)?;
    tx.commit()?;

    tracing::info!(
        old_vault_id = %old.id,
        vault_id = %record.id,
        from = %old.strategy,
        to = %record.strategy,
        "vault rotated"
    );
    Ok(record)
}

fn seal_for_wallet(
    deriver: &KeyDeriver,
    user_id: &str,
    wallet_id: &str,
    plaintext: &[u8],
    method: &ImportMethod,
) -> Result<NewVaultRecord, VaultError> {
    let strategy = method.strategy();
    let kdf_salt = method.salt(wallet_id);
    let kdf_context = Vec::new();

    let key = deriver.derive(&strategy, method.password(), &kdf_salt, &kdf_context)?;
    let nonce = symmetric::generate_nonce();
    let ciphertext = symmetric::seal(key.expose(), &nonce, plaintext)?;

    Ok(NewVaultRecord {
        user_id: user_id.to_string(),
        wallet_id: wallet_id.to_string(),
        ciphertext,
        nonce,
        strategy,
        kdf_salt,
        kdf_context,
    })
}
