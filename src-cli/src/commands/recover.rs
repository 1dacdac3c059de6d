//! `keyward recover`.

use keyward_crypto_core::SearchOutcome;
use serde::Serialize;

use super::CommandError;
use crate::cli::RecoverArgs;
use crate::state::AppContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryDto {
    pub vault_id: String,
    pub found: bool,
    pub tried: usize,
    /// Zero-based line (blank lines skipped) of the matching candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_index: Option<usize>,
    /// Winning candidate; only with `--reveal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    /// Only with `--reveal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for RecoveryDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryDto")
            .field("vault_id", &self.vault_id)
            .field("found", &self.found)
            .field("tried", &self.tried)
            .field("candidate_index", &self.candidate_index)
            .finish_non_exhaustive()
    }
}

impl Drop for RecoveryDto {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.candidate);
        zeroize::Zeroize::zeroize(&mut self.private_key);
    }
}

/// Search the candidate file against a vault.
///
/// A hit reports the candidate's position; the candidate and the recovered
/// key are printed only with `--reveal`.
///
/// # Errors
///
/// `404` unknown vault, `500` if the candidate file cannot be read.
pub fn recover(ctx: &AppContext, args: &RecoverArgs) -> Result<RecoveryDto, CommandError> {
    let candidates = keyward_vault::load_candidates(&args.candidates)?;
    let outcome = keyward_vault::recover_vault(
        ctx.db.connection(),
        &args.vault,
        candidates.iter().map(|c| c.as_str()),
    )?;

    let tried = outcome.tried();
    Ok(match outcome {
        SearchOutcome::Found {
            plaintext,
            candidate,
            index,
        } => {
            let (candidate, private_key) = if args.reveal {
                (
                    Some(candidate.to_owned()),
                    Some(String::from_utf8_lossy(plaintext.expose()).into_owned()),
                )
            } else {
                (None, None)
            };
            RecoveryDto {
                vault_id: args.vault.clone(),
                found: true,
                tried,
                candidate_index: Some(index),
                candidate,
                private_key,
            }
        }
        SearchOutcome::Exhausted { .. } => RecoveryDto {
            vault_id: args.vault.clone(),
            found: false,
            tried,
            candidate_index: None,
            candidate: None,
            private_key: None,
        },
    })
}
