//! `keyward reconcile`.

use keyward_vault::ReconcileReport;

use super::CommandError;
use crate::state::AppContext;

/// Delete the user's wallets that have no vault. The report keeps its
/// snake_case keys.
///
/// # Errors
///
/// `500` if the wallet or vault listing fails.
pub fn reconcile(ctx: &AppContext, user: &str) -> Result<ReconcileReport, CommandError> {
    if user.trim().is_empty() {
        return Err(CommandError::bad_request("malformed input: user id is required"));
    }
    Ok(keyward_vault::reconcile_wallets(&ctx.db, user)?)
}
