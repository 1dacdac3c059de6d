//! `keyward decrypt`.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use keyward_vault::DecryptRequest;

use super::CommandError;
use crate::cli::DecryptArgs;
use crate::state::AppContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedDto {
    pub vault_id: String,
    pub private_key: String,
}

impl std::fmt::Debug for DecryptedDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedDto")
            .field("vault_id", &self.vault_id)
            .field("private_key", &"***")
            .finish()
    }
}

impl Drop for DecryptedDto {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.private_key);
    }
}

/// Run the decrypt pipeline for the caller described by `args`.
///
/// # Errors
///
/// `401` unauthorized, `400` malformed input, `404` unknown vault, `500`
/// decryption failure.
pub fn decrypt(ctx: &AppContext, args: DecryptArgs, now: u64) -> Result<DecryptedDto, CommandError> {
    let request = DecryptRequest {
        vault_id: args.vault,
        ciphertext: args.ciphertext,
        nonce: args.nonce,
        password: args.password.map(SecretString::from),
        session: args.session,
        service_token: args.service_token,
    };
    let plaintext = keyward_vault::decrypt_vault(
        ctx.db.connection(),
        &ctx.gate,
        &ctx.deriver,
        &request,
        now,
    )?;
    Ok(DecryptedDto {
        vault_id: request.vault_id.clone(),
        private_key: plaintext.expose_secret().to_string(),
    })
}
