//! Vault record store: sealed private keys, one per wallet.
//!
//! Records are immutable. There is no update path; rotation deletes and
//! re-inserts inside a transaction (see [`crate::custody::rotate_vault`]).
//! The `UNIQUE(wallet_id)` constraint is the only guard against two vaults
//! racing onto the same wallet.

use keyward_crypto_core::kdf::DerivationStrategy;
use keyward_crypto_core::symmetric::NONCE_LEN;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::VaultError;
use crate::util::{generate_uuid, now_iso8601};

/// A vault about to be persisted.
#[derive(Debug, Clone)]
pub struct NewVaultRecord {
    pub user_id: String,
    pub wallet_id: String,
    /// `ciphertext || tag`.
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub strategy: DerivationStrategy,
    pub kdf_salt: Vec<u8>,
    pub kdf_context: Vec<u8>,
}

/// A persisted vault.
///
/// Ciphertext and nonce are opaque here; only the AEAD layer interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRecord {
    pub id: String,
    pub user_id: String,
    pub wallet_id: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    /// How the AES key was derived. Read back from the `kdf*` columns.
    pub strategy: DerivationStrategy,
    pub kdf_salt: Vec<u8>,
    pub kdf_context: Vec<u8>,
    pub created_at: String,
}

const VAULT_COLUMNS: &str = "id, user_id, wallet_id, ciphertext, nonce, kdf, kdf_iterations, \
                             kdf_salt, kdf_context, created_at";

/// Raw row before the strategy columns are parsed.
struct VaultRow {
    id: String,
    user_id: String,
    wallet_id: String,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    kdf: String,
    kdf_iterations: Option<u32>,
    kdf_salt: Vec<u8>,
    kdf_context: Vec<u8>,
    created_at: String,
}

impl VaultRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            wallet_id: row.get(2)?,
            ciphertext: row.get(3)?,
            nonce: row.get(4)?,
            kdf: row.get(5)?,
            kdf_iterations: row.get(6)?,
            kdf_salt: row.get(7)?,
            kdf_context: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<VaultRecord, VaultError> {
        let strategy = DerivationStrategy::from_id(&self.kdf, self.kdf_iterations)
            .map_err(|e| VaultError::Database(format!("vault {} is unreadable: {e}", self.id)))?;
        Ok(VaultRecord {
            id: self.id,
            user_id: self.user_id,
            wallet_id: self.wallet_id,
            ciphertext: self.ciphertext,
            nonce: self.nonce,
            strategy,
            kdf_salt: self.kdf_salt,
            kdf_context: self.kdf_context,
            created_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Check that `wallet_id` exists and belongs to `user_id`.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the wallet does not exist.
/// - [`VaultError::Unauthorized`] if another user owns it.
pub fn ensure_wallet_owner(
    conn: &rusqlite::Connection,
    user_id: &str,
    wallet_id: &str,
) -> Result<(), VaultError> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT user_id FROM wallets WHERE id = ?1",
            params![wallet_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| VaultError::Database(format!("failed to look up wallet owner: {e}")))?;

    match owner {
        None => Err(VaultError::NotFound(format!("wallet {wallet_id}"))),
        Some(owner) if owner != user_id => Err(VaultError::Unauthorized),
        Some(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Persist a new vault for a wallet that has none.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if the wallet does not exist.
/// - [`VaultError::Unauthorized`] if the wallet belongs to another user.
/// - [`VaultError::Conflict`] if the wallet already has a vault; the
///   existing vault is left untouched.
/// - [`VaultError::Database`] for other storage failures.
pub fn create_vault_record(
    conn: &rusqlite::Connection,
    new: &NewVaultRecord,
) -> Result<VaultRecord, VaultError> {
    ensure_wallet_owner(conn, &new.user_id, &new.wallet_id)?;

    let id = generate_uuid();
    let now = now_iso8601();

    conn.execute(
        &format!(
            "INSERT INTO secure_vaults ({VAULT_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            id,
            new.user_id,
            new.wallet_id,
            new.ciphertext,
            &new.nonce[..],
            new.strategy.id(),
            new.strategy.iterations(),
            new.kdf_salt,
            new.kdf_context,
            now,
        ],
    )
    .map_err(|e| match VaultError::from(e) {
        VaultError::Conflict(_) => {
            VaultError::Conflict(format!("wallet {} already has a vault", new.wallet_id))
        }
        VaultError::Database(msg) => VaultError::Database(format!("failed to create vault: {msg}")),
        other => other,
    })?;

    Ok(VaultRecord {
        id,
        user_id: new.user_id.clone(),
        wallet_id: new.wallet_id.clone(),
        ciphertext: new.ciphertext.clone(),
        nonce: new.nonce.to_vec(),
        strategy: new.strategy,
        kdf_salt: new.kdf_salt.clone(),
        kdf_context: new.kdf_context.clone(),
        created_at: now,
    })
}

/// Fetch one vault by ID.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no vault has this ID.
/// - [`VaultError::Database`] if the query fails or the strategy columns
///   cannot be parsed.
pub fn get_vault_record(
    conn: &rusqlite::Connection,
    vault_id: &str,
) -> Result<VaultRecord, VaultError> {
    conn.query_row(
        &format!("SELECT {VAULT_COLUMNS} FROM secure_vaults WHERE id = ?1"),
        params![vault_id],
        VaultRow::from_row,
    )
    .optional()
    .map_err(|e| VaultError::Database(format!("failed to load vault: {e}")))?
    .ok_or_else(|| VaultError::NotFound(format!("vault {vault_id}")))?
    .into_record()
}

/// The vault attached to `wallet_id`, if any.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn find_vault_by_wallet(
    conn: &rusqlite::Connection,
    wallet_id: &str,
) -> Result<Option<VaultRecord>, VaultError> {
    conn.query_row(
        &format!("SELECT {VAULT_COLUMNS} FROM secure_vaults WHERE wallet_id = ?1"),
        params![wallet_id],
        VaultRow::from_row,
    )
    .optional()
    .map_err(|e| VaultError::Database(format!("failed to load vault: {e}")))?
    .map(VaultRow::into_record)
    .transpose()
}

/// All vaults of `user_id`, oldest first.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_vault_records_by_user(
    conn: &rusqlite::Connection,
    user_id: &str,
) -> Result<Vec<VaultRecord>, VaultError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VAULT_COLUMNS} FROM secure_vaults WHERE user_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .map_err(|e| VaultError::Database(format!("failed to prepare vault query: {e}")))?;

    let rows = stmt
        .query_map(params![user_id], VaultRow::from_row)
        .map_err(|e| VaultError::Database(format!("failed to query vaults: {e}")))?;

    let mut records = Vec::new();
    for row in rows {
        let row = row.map_err(|e| VaultError::Database(format!("failed to read vault row: {e}")))?;
        records.push(row.into_record()?);
    }
    Ok(records)
}

/// Delete one vault. The wallet stays and becomes non-spendable.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no vault has this ID.
/// - [`VaultError::Database`] if the DELETE fails.
pub fn delete_vault_record(conn: &rusqlite::Connection, vault_id: &str) -> Result<(), VaultError> {
    let deleted = conn
        .execute("DELETE FROM secure_vaults WHERE id = ?1", params![vault_id])
        .map_err(|e| VaultError::Database(format!("failed to delete vault: {e}")))?;

    if deleted == 0 {
        return Err(VaultError::NotFound(format!("vault {vault_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::VaultDb;
    use crate::wallets::{create_wallet, delete_wallet};

    fn new_record(user_id: &str, wallet_id: &str, strategy: DerivationStrategy) -> NewVaultRecord {
        NewVaultRecord {
            user_id: user_id.into(),
            wallet_id: wallet_id.into(),
            ciphertext: vec![0xAB; 48],
            nonce: [1u8; NONCE_LEN],
            strategy,
            kdf_salt: wallet_id.as_bytes().to_vec(),
            kdf_context: Vec::new(),
        }
    }

    #[test]
    fn create_and_get_preserve_strategy() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "alice", "0x1", "").unwrap();

        for (wallet, strategy) in [
            (w.id.clone(), DerivationStrategy::password()),
            (
                create_wallet(conn, "alice", "0x2", "").unwrap().id,
                DerivationStrategy::HkdfSha256,
            ),
            (
                create_wallet(conn, "alice", "0x3", "").unwrap().id,
                DerivationStrategy::StaticKey,
            ),
        ] {
            let created = create_vault_record(conn, &new_record("alice", &wallet, strategy)).unwrap();
            let loaded = get_vault_record(conn, &created.id).unwrap();
            assert_eq!(loaded, created);
            assert_eq!(loaded.strategy, strategy);
        }
    }

    #[test]
    fn second_vault_for_wallet_conflicts() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "alice", "0x1", "").unwrap();
        let first = create_vault_record(conn, &new_record("alice", &w.id, DerivationStrategy::password()))
            .unwrap();

        let mut second = new_record("alice", &w.id, DerivationStrategy::HkdfSha256);
        second.ciphertext = vec![0xCD; 48];
        let err = create_vault_record(conn, &second).unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));

        let still = get_vault_record(conn, &first.id).unwrap();
        assert_eq!(still, first);
    }

    #[test]
    fn wallet_of_other_user_is_unauthorized() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "bob", "0x1", "").unwrap();
        let err = create_vault_record(conn, &new_record("alice", &w.id, DerivationStrategy::password()))
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized));
    }

    #[test]
    fn missing_wallet_is_not_found() {
        let db = VaultDb::open_in_memory().unwrap();
        let err = create_vault_record(
            db.connection(),
            &new_record("alice", "ghost", DerivationStrategy::password()),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "alice", "0x1", "").unwrap();
        let v = create_vault_record(conn, &new_record("alice", &w.id, DerivationStrategy::password()))
            .unwrap();

        delete_vault_record(conn, &v.id).unwrap();
        assert!(matches!(get_vault_record(conn, &v.id), Err(VaultError::NotFound(_))));
        assert!(matches!(delete_vault_record(conn, &v.id), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn deleting_wallet_cascades_to_vault() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "alice", "0x1", "").unwrap();
        let v = create_vault_record(conn, &new_record("alice", &w.id, DerivationStrategy::StaticKey))
            .unwrap();

        delete_wallet(conn, &w.id).unwrap();
        assert!(matches!(get_vault_record(conn, &v.id), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn list_and_find_by_wallet() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w1 = create_wallet(conn, "alice", "0x1", "").unwrap();
        let w2 = create_wallet(conn, "alice", "0x2", "").unwrap();
        let v1 = create_vault_record(conn, &new_record("alice", &w1.id, DerivationStrategy::password()))
            .unwrap();

        assert_eq!(list_vault_records_by_user(conn, "alice").unwrap(), vec![v1.clone()]);
        assert!(list_vault_records_by_user(conn, "bob").unwrap().is_empty());
        assert_eq!(find_vault_by_wallet(conn, &w1.id).unwrap(), Some(v1));
        assert_eq!(find_vault_by_wallet(conn, &w2.id).unwrap(), None);
    }

    #[test]
    fn unknown_strategy_in_row_is_reported() {
        let db = VaultDb::open_in_memory().unwrap();
        let conn = db.connection();
        let w = create_wallet(conn, "alice", "0x1", "").unwrap();
        let v = create_vault_record(conn, &new_record("alice", &w.id, DerivationStrategy::password()))
            .unwrap();
        conn.execute("UPDATE secure_vaults SET kdf = 'rot13' WHERE id = ?1", params![v.id])
            .unwrap();

        assert!(matches!(get_vault_record(conn, &v.id), Err(VaultError::Database(_))));
    }
}
