//! `keyward-vault`: wallet custody for Keyward.
//!
//! Stores wallets and their sealed private keys in `SQLite`, decides who may
//! decrypt them, and reconciles wallets that have lost their vault.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod db;
pub mod error;
mod util;

pub mod encoding;

pub mod config;

pub mod store;
pub mod wallets;

pub mod access;
pub mod custody;
pub mod decrypt;

pub mod reconcile;
pub mod recovery;

pub use access::{AccessGate, AccessRequest, Caller, GatePolicy, SessionResolver, StaticSessions};
pub use config::{KeywardConfig, CONFIG_FILE};
pub use custody::{import_private_key, rotate_vault, ImportMethod, ImportRequest};
pub use db::VaultDb;
pub use decrypt::{decrypt_vault, DecryptRequest};
pub use encoding::{decode_field, encode_base64, encode_hex};
pub use error::VaultError;
pub use reconcile::{reconcile_wallets, CustodyCatalog, ReconcileReport};
pub use recovery::{load_candidates, recover_vault};
pub use store::{
    create_vault_record, delete_vault_record, find_vault_by_wallet, get_vault_record,
    list_vault_records_by_user, NewVaultRecord, VaultRecord,
};
pub use util::current_epoch_secs;
pub use wallets::{create_wallet, delete_wallet, get_wallet, list_wallets, rename_wallet, Wallet};
