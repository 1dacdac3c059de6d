//! `keyward import` and `keyward rotate`.

use secrecy::SecretString;
use serde::Serialize;

use keyward_vault::{ImportMethod, ImportRequest, VaultRecord};

use super::CommandError;
use crate::cli::MethodArg;
use crate::state::AppContext;

/// Public view of a vault. Never carries ciphertext or key material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDto {
    pub id: String,
    pub user_id: String,
    pub wallet_id: String,
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    pub created_at: String,
}

fn vault_to_dto(v: &VaultRecord) -> VaultDto {
    VaultDto {
        id: v.id.clone(),
        user_id: v.user_id.clone(),
        wallet_id: v.wallet_id.clone(),
        strategy: v.strategy.id().to_string(),
        iterations: v.strategy.iterations(),
        created_at: v.created_at.clone(),
    }
}

/// Build an [`ImportMethod`], requiring a password exactly when the method
/// needs one.
///
/// # Errors
///
/// `400` if `--method password` has no password.
pub fn import_method(method: MethodArg, password: Option<String>) -> Result<ImportMethod, CommandError> {
    match method {
        MethodArg::Password => password
            .filter(|p| !p.is_empty())
            .map(|p| ImportMethod::Password(SecretString::from(p)))
            .ok_or_else(|| CommandError::bad_request("malformed input: a password is required")),
        MethodArg::SharedSecret => Ok(ImportMethod::SharedSecret),
        MethodArg::StaticKey => Ok(ImportMethod::StaticKey),
    }
}

/// Seal `private_key` into the wallet's vault.
///
/// # Errors
///
/// `400` malformed input, `401` wallet of another user, `404` unknown
/// wallet, `409` wallet already has a vault.
pub fn import(
    ctx: &AppContext,
    user: &str,
    wallet: &str,
    private_key: SecretString,
    method: ImportMethod,
) -> Result<VaultDto, CommandError> {
    let request = ImportRequest {
        user_id: user.to_string(),
        wallet_id: wallet.to_string(),
        private_key,
        method,
    };
    let record = keyward_vault::import_private_key(ctx.db.connection(), &ctx.deriver, &request)?;
    Ok(vault_to_dto(&record))
}

/// Re-seal a vault under `method`.
///
/// # Errors
///
/// `404` unknown vault, `500` if the current vault cannot be opened.
pub fn rotate(
    ctx: &AppContext,
    vault_id: &str,
    old_password: Option<String>,
    method: &ImportMethod,
) -> Result<VaultDto, CommandError> {
    let old_password = old_password.map(SecretString::from);
    let record = keyward_vault::rotate_vault(
        ctx.db.connection(),
        &ctx.deriver,
        vault_id,
        old_password.as_ref(),
        method,
    )?;
    Ok(vault_to_dto(&record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_method_requires_password() {
        assert_eq!(
            import_method(MethodArg::Password, None).unwrap_err().status,
            400
        );
        assert!(import_method(MethodArg::Password, Some(String::new())).is_err());
        assert!(matches!(
            import_method(MethodArg::Password, Some("pw".into())),
            Ok(ImportMethod::Password(_))
        ));
    }

    #[test]
    fn other_methods_ignore_password() {
        assert!(matches!(
            import_method(MethodArg::SharedSecret, Some("pw".into())),
            Ok(ImportMethod::SharedSecret)
        ));
        assert!(matches!(
            import_method(MethodArg::StaticKey, None),
            Ok(ImportMethod::StaticKey)
        ));
    }
}
