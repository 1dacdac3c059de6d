//! `keyward wallet add|list|rename|delete`.

use serde::Serialize;

use keyward_vault::{find_vault_by_wallet, Wallet};

use super::CommandError;
use crate::state::AppContext;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub id: String,
    pub user_id: String,
    pub address: String,
    pub label: String,
    /// Whether a vault holds this wallet's key.
    pub spendable: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedDto {
    pub deleted: String,
}

fn wallet_to_dto(w: Wallet, spendable: bool) -> WalletDto {
    WalletDto {
        id: w.id,
        user_id: w.user_id,
        address: w.address,
        label: w.label,
        spendable,
        created_at: w.created_at,
        updated_at: w.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Register a wallet address.
///
/// # Errors
///
/// `400` for a blank user or address.
pub fn add(ctx: &AppContext, user: &str, address: &str, label: &str) -> Result<WalletDto, CommandError> {
    let wallet = keyward_vault::create_wallet(ctx.db.connection(), user, address, label.trim())?;
    tracing::info!(wallet_id = %wallet.id, "wallet created");
    Ok(wallet_to_dto(wallet, false))
}

/// List a user's wallets with their spendable flag.
///
/// # Errors
///
/// `500` on storage failure.
pub fn list(ctx: &AppContext, user: &str) -> Result<Vec<WalletDto>, CommandError> {
    let conn = ctx.db.connection();
    keyward_vault::list_wallets(conn, user)?
        .into_iter()
        .map(|w| -> Result<WalletDto, CommandError> {
            let spendable = find_vault_by_wallet(conn, &w.id)?.is_some();
            Ok(wallet_to_dto(w, spendable))
        })
        .collect()
}

/// Change a wallet's label.
///
/// # Errors
///
/// `404` for an unknown wallet.
pub fn rename(ctx: &AppContext, wallet_id: &str, label: &str) -> Result<WalletDto, CommandError> {
    let conn = ctx.db.connection();
    let wallet = keyward_vault::rename_wallet(conn, wallet_id, label.trim())?;
    let spendable = find_vault_by_wallet(conn, wallet_id)?.is_some();
    Ok(wallet_to_dto(wallet, spendable))
}

/// Delete a wallet and its vault.
///
/// # Errors
///
/// `404` for an unknown wallet.
pub fn delete(ctx: &AppContext, wallet_id: &str) -> Result<DeletedDto, CommandError> {
    keyward_vault::delete_wallet(ctx.db.connection(), wallet_id)?;
    tracing::info!(%wallet_id, "wallet deleted");
    Ok(DeletedDto {
        deleted: wallet_id.to_string(),
    })
}
