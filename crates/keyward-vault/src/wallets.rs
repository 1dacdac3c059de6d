//! Wallet records: the public half of a custody pair.
//!
//! A wallet is spendable only while a vault row references it. Deleting a
//! wallet cascades to its vault through the foreign key.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::error::VaultError;
use crate::util::{generate_uuid, now_iso8601};

/// A wallet owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    /// Chain address, as supplied at import.
    pub address: String,
    pub label: String,
    pub created_at: String,
    pub updated_at: String,
}

const WALLET_COLUMNS: &str = "id, user_id, address, label, created_at, updated_at";

fn wallet_from_row(row: &Row<'_>) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        address: row.get(2)?,
        label: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Create a wallet for `user_id`.
///
/// # Errors
///
/// - [`VaultError::MalformedInput`] if `user_id` or `address` is blank.
/// - [`VaultError::Database`] if the INSERT fails.
pub fn create_wallet(
    conn: &rusqlite::Connection,
    user_id: &str,
    address: &str,
    label: &str,
) -> Result<Wallet, VaultError> {
    let address = address.trim();
    if user_id.trim().is_empty() {
        return Err(VaultError::MalformedInput("user id is required".into()));
    }
    if address.is_empty() {
        return Err(VaultError::MalformedInput("wallet address is required".into()));
    }

    let id = generate_uuid();
    let now = now_iso8601();

    conn.execute(
        "INSERT INTO wallets (id, user_id, address, label, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, user_id, address, label, now, now],
    )
    .map_err(|e| VaultError::Database(format!("failed to create wallet: {e}")))?;

    Ok(Wallet {
        id,
        user_id: user_id.to_string(),
        address: address.to_string(),
        label: label.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Fetch one wallet by ID.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no wallet has this ID.
/// - [`VaultError::Database`] if the query fails.
pub fn get_wallet(conn: &rusqlite::Connection, wallet_id: &str) -> Result<Wallet, VaultError> {
    conn.query_row(
        &format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?1"),
        params![wallet_id],
        wallet_from_row,
    )
    .optional()
    .map_err(|e| VaultError::Database(format!("failed to load wallet: {e}")))?
    .ok_or_else(|| VaultError::NotFound(format!("wallet {wallet_id}")))
}

/// All wallets of `user_id`, oldest first.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list_wallets(conn: &rusqlite::Connection, user_id: &str) -> Result<Vec<Wallet>, VaultError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .map_err(|e| VaultError::Database(format!("failed to prepare wallet query: {e}")))?;

    let rows = stmt
        .query_map(params![user_id], wallet_from_row)
        .map_err(|e| VaultError::Database(format!("failed to query wallets: {e}")))?;

    let mut wallets = Vec::new();
    for row in rows {
        wallets.push(
            row.map_err(|e| VaultError::Database(format!("failed to read wallet row: {e}")))?,
        );
    }
    Ok(wallets)
}

/// Change a wallet's label. The only in-place mutation a wallet allows.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no wallet has this ID.
/// - [`VaultError::Database`] if the UPDATE fails.
pub fn rename_wallet(
    conn: &rusqlite::Connection,
    wallet_id: &str,
    label: &str,
) -> Result<Wallet, VaultError> {
    let updated = conn
        .execute(
            "UPDATE wallets SET label = ?1, updated_at = ?2 WHERE id = ?3",
            params![label, now_iso8601(), wallet_id],
        )
        .map_err(|e| VaultError::Database(format!("failed to rename wallet: {e}")))?;

    if updated == 0 {
        return Err(VaultError::NotFound(format!("wallet {wallet_id}")));
    }
    get_wallet(conn, wallet_id)
}

/// Delete a wallet and, through the cascade, its vault.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no wallet has this ID.
/// - [`VaultError::Database`] if the DELETE fails.
pub fn delete_wallet(conn: &rusqlite::Connection, wallet_id: &str) -> Result<(), VaultError> {
    let deleted = conn
        .execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])
        .map_err(|e| VaultError::Database(format!("failed to delete wallet: {e}")))?;

    if deleted == 0 {
        return Err(VaultError::NotFound(format!("wallet {wallet_id}")));
    }
    Ok(())
}
