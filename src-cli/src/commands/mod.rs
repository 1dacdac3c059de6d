//! Command handlers.
//!
//! Each handler takes the assembled [`crate::state::AppContext`] and returns
//! a DTO; the dispatcher in [`crate::execute`] turns it into JSON. Errors
//! become a [`CommandError`] carrying only the caller-safe message.

use serde::Serialize;

use keyward_vault::VaultError;

pub mod decrypt;
pub mod init;
pub mod reconcile;
pub mod recover;
pub mod token;
pub mod vaults;
pub mod wallet;

/// Error body printed for a failed command: `{"error": "...", "status": 401}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandError {
    pub error: String,
    pub status: u16,
}

impl CommandError {
    /// A `400` for arguments the command itself rejects.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: 400,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.status {
            400 => 2,
            401 => 3,
            404 => 4,
            409 => 5,
            _ => 1,
        }
    }
}

impl From<VaultError> for CommandError {
    fn from(err: VaultError) -> Self {
        let status = err.status_code();
        if status >= 500 {
            tracing::error!(error = %err, "command failed");
        } else {
            tracing::debug!(error = %err, "command rejected");
        }
        Self {
            error: err.public_message(),
            status,
        }
    }
}

/// Serialize an error body, falling back to the bare message.
#[must_use]
pub fn err_json(err: &CommandError) -> String {
    serde_json::to_string(err).unwrap_or_else(|_| err.error.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_crypto_core::CryptoError;

    #[test]
    fn err_json_produces_error_and_status() {
        let json = err_json(&CommandError::from(VaultError::Unauthorized));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["error"], "unauthorized");
        assert_eq!(parsed["status"], 401);
    }

    #[test]
    fn authentication_failure_hides_cause() {
        let err = CommandError::from(VaultError::Crypto(CryptoError::AuthenticationFailure));
        assert_eq!(err.status, 500);
        assert_eq!(err.error, "decryption failed");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn exit_codes_distinguish_statuses() {
        let codes: Vec<u8> = [400, 401, 404, 409, 500]
            .into_iter()
            .map(|status| {
                CommandError {
                    error: String::new(),
                    status,
                }
                .exit_code()
            })
            .collect();
        assert_eq!(codes, vec![2, 3, 4, 5, 1]);
    }
}
