//! Wallet reconciliation: a wallet is spendable iff a vault references it.
//!
//! Wallets without a vault are deleted. Deletions run one at a time; a
//! failure is logged and skipped, and the batch carries on. Running the
//! reconciler again on a clean state deletes nothing.

use std::collections::HashSet;

use serde::Serialize;

use crate::db::VaultDb;
use crate::error::VaultError;
use crate::store::list_vault_records_by_user;
use crate::wallets::{delete_wallet, list_wallets};

/// The wallet and vault listings the reconciler works from.
pub trait CustodyCatalog {
    /// IDs of every wallet owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Any storage failure; it aborts the run.
    fn wallet_ids(&self, user_id: &str) -> Result<Vec<String>, VaultError>;

    /// IDs of the wallets of `user_id` that have a vault.
    ///
    /// # Errors
    ///
    /// Any storage failure; it aborts the run.
    fn vaulted_wallet_ids(&self, user_id: &str) -> Result<Vec<String>, VaultError>;

    /// Delete one wallet.
    ///
    /// # Errors
    ///
    /// Any failure; the reconciler logs it and moves on.
    fn delete_wallet(&self, wallet_id: &str) -> Result<(), VaultError>;
}

impl CustodyCatalog for VaultDb {
    fn wallet_ids(&self, user_id: &str) -> Result<Vec<String>, VaultError> {
        Ok(list_wallets(self.connection(), user_id)?
            .into_iter()
            .map(|w| w.id)
            .collect())
    }

    fn vaulted_wallet_ids(&self, user_id: &str) -> Result<Vec<String>, VaultError> {
        Ok(list_vault_records_by_user(self.connection(), user_id)?
            .into_iter()
            .map(|v| v.wallet_id)
            .collect())
    }

    fn delete_wallet(&self, wallet_id: &str) -> Result<(), VaultError> {
        delete_wallet(self.connection(), wallet_id)
    }
}

/// Outcome of one reconciliation run. Serialized with snake_case keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Wallets owned by the user when the run started.
    pub total_wallets: usize,
    /// Wallets that had a vault.
    pub spendable_wallets: usize,
    /// Wallets actually deleted. Failed deletions are not counted.
    pub deleted_wallets: usize,
    /// Wallets left after the run, re-listed from the catalog.
    pub remaining_wallets: usize,
}

/// Delete every wallet of `user_id` that has no vault.
///
/// # Errors
///
/// Returns an error only when a listing fails. Individual deletion failures
/// are logged with `tracing::warn!` and reflected in the counts.
pub fn reconcile_wallets<C>(catalog: &C, user_id: &str) -> Result<ReconcileReport, VaultError>
where
    C: CustodyCatalog + ?Sized,
{
    let wallets = catalog.wallet_ids(user_id)?;
    let vaulted: HashSet<String> = catalog.vaulted_wallet_ids(user_id)?.into_iter().collect();

    let (spendable, orphans): (Vec<&String>, Vec<&String>) =
        wallets.iter().partition(|id| vaulted.contains(*id));

    let mut deleted = 0usize;
    for wallet_id in orphans {
        match catalog.delete_wallet(wallet_id) {
            Ok(()) => {
                deleted = deleted.saturating_add(1);
                tracing::debug!(%wallet_id, "deleted wallet without vault");
            }
            Err(e) => {
                tracing::warn!(%wallet_id, error = %e, "failed to delete wallet without vault");
            }
        }
    }

    let remaining = catalog.wallet_ids(user_id)?.len();

    let report = ReconcileReport {
        total_wallets: wallets.len(),
        spendable_wallets: spendable.len(),
        deleted_wallets: deleted,
        remaining_wallets: remaining,
    };
    tracing::info!(
        user_id,
        total = report.total_wallets,
        spendable = report.spendable_wallets,
        deleted = report.deleted_wallets,
        remaining = report.remaining_wallets,
        "wallet reconciliation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// In-memory catalog whose deletions can be made to fail per wallet.
    #[derive(Default)]
    struct FakeCatalog {
        wallets: RefCell<Vec<String>>,
        vaulted: Vec<String>,
        undeletable: Vec<String>,
    }

    impl FakeCatalog {
        fn new(wallets: &[&str], vaulted: &[&str]) -> Self {
            Self {
                wallets: RefCell::new(wallets.iter().map(|s| (*s).to_string()).collect()),
                vaulted: vaulted.iter().map(|s| (*s).to_string()).collect(),
                undeletable: Vec::new(),
            }
        }
    }

    impl CustodyCatalog for FakeCatalog {
        fn wallet_ids(&self, _user_id: &str) -> Result<Vec<String>, VaultError> {
            Ok(self.wallets.borrow().clone())
        }

        fn vaulted_wallet_ids(&self, _user_id: &str) -> Result<Vec<String>, VaultError> {
            Ok(self.vaulted.clone())
        }

        fn delete_wallet(&self, wallet_id: &str) -> Result<(), VaultError> {
            if self.undeletable.iter().any(|w| w == wallet_id) {
                return Err(VaultError::Database("database is locked".into()));
            }
            self.wallets.borrow_mut().retain(|w| w != wallet_id);
            Ok(())
        }
    }

    #[test]
    fn deletes_uncovered_wallets_and_is_idempotent() {
        let catalog = FakeCatalog::new(&["w1", "w2", "w3"], &["w1"]);

        let first = reconcile_wallets(&catalog, "alice").unwrap();
        assert_eq!(
            first,
            ReconcileReport {
                total_wallets: 3,
                spendable_wallets: 1,
                deleted_wallets: 2,
                remaining_wallets: 1,
            }
        );

        let second = reconcile_wallets(&catalog, "alice").unwrap();
        assert_eq!(
            second,
            ReconcileReport {
                total_wallets: 1,
                spendable_wallets: 1,
                deleted_wallets: 0,
                remaining_wallets: 1,
            }
        );
    }

    #[test]
    fn failed_deletion_is_skipped_not_counted() {
        let mut catalog = FakeCatalog::new(&["w1", "w2", "w3"], &[]);
        catalog.undeletable.push("w2".into());

        let report = reconcile_wallets(&catalog, "alice").unwrap();
        assert_eq!(report.total_wallets, 3);
        assert_eq!(report.deleted_wallets, 2);
        assert_eq!(report.remaining_wallets, 1);
        assert_eq!(*catalog.wallets.borrow(), vec!["w2".to_string()]);
    }

    #[test]
    fn empty_user_reports_zeros() {
        let catalog = FakeCatalog::default();
        assert_eq!(
            reconcile_wallets(&catalog, "nobody").unwrap(),
            ReconcileReport::default()
        );
    }

    #[test]
    fn report_serializes_with_snake_case_keys() {
        let json = serde_json::to_value(ReconcileReport {
            total_wallets: 3,
            spendable_wallets: 1,
            deleted_wallets: 2,
            remaining_wallets: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total_wallets": 3,
                "spendable_wallets": 1,
                "deleted_wallets": 2,
                "remaining_wallets": 1,
            })
        );
    }
}
