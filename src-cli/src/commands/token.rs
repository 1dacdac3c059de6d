//! `keyward issue-token`.

use serde::Serialize;

use keyward_vault::{KeywardConfig, VaultError};

use super::CommandError;

/// Longest lifetime a token may be issued for: one day.
pub const MAX_TTL_SECS: u64 = 86_400;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub service: String,
    pub token: String,
    pub expires_at: u64,
}

impl std::fmt::Debug for TokenDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDto")
            .field("service", &self.service)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Mint a service token valid for `ttl` seconds from `now`.
///
/// # Errors
///
/// - `400` for a zero or over-long `ttl` or an invalid service name.
/// - `500` if no signing key is configured.
pub fn issue_token(
    config: &KeywardConfig,
    service: &str,
    ttl: u64,
    now: u64,
) -> Result<TokenDto, CommandError> {
    if ttl == 0 || ttl > MAX_TTL_SECS {
        return Err(CommandError::bad_request(format!(
            "malformed input: ttl must be between 1 and {MAX_TTL_SECS} seconds"
        )));
    }
    let credentials = config.service_credentials()?.ok_or_else(|| {
        VaultError::Config("serviceSigningKey is not configured".into())
    })?;

    let expires_at = now.saturating_add(ttl);
    let token = credentials
        .issue(service, expires_at)
        .map_err(|e| CommandError::bad_request(e.to_string()))?;

    tracing::info!(service, expires_at, "service token issued");
    Ok(TokenDto {
        service: service.to_string(),
        token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> KeywardConfig {
        let mut config = KeywardConfig::default();
        config.service_signing_key = Some(format!("hex:{}", "ab".repeat(32)));
        config
    }

    #[test]
    fn issued_token_verifies_with_same_config() {
        let config = config_with_key();
        let dto = issue_token(&config, "reconciler", 60, 1_000).unwrap();
        assert_eq!(dto.expires_at, 1_060);

        let creds = config.service_credentials().unwrap().unwrap();
        let verified = creds.verify(&dto.token, 1_030).unwrap();
        assert_eq!(verified.service, "reconciler");
    }

    #[test]
    fn missing_signing_key_is_internal_error() {
        let err = issue_token(&KeywardConfig::default(), "svc", 60, 0).unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[test]
    fn ttl_bounds_are_enforced() {
        let config = config_with_key();
        assert_eq!(issue_token(&config, "svc", 0, 0).unwrap_err().status, 400);
        assert_eq!(
            issue_token(&config, "svc", MAX_TTL_SECS + 1, 0).unwrap_err().status,
            400
        );
    }

    #[test]
    fn dotted_service_name_is_rejected() {
        let err = issue_token(&config_with_key(), "a.b", 60, 0).unwrap_err();
        assert_eq!(err.status, 400);
    }
}
