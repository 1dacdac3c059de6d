//! Operator recovery: search candidate inputs against a stored vault.
//!
//! The vault's persisted strategy, salt, and context are reused for every
//! candidate, so a candidate is whatever that strategy takes as input: a
//! password for `pbkdf2-sha256`, a shared secret for `hkdf-sha256`, a raw
//! key for `static-key`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use keyward_crypto_core::search::{search, SearchOutcome, SearchTarget};
use rusqlite::Connection;
use zeroize::Zeroizing;

use crate::error::VaultError;
use crate::store::get_vault_record;

/// Try `candidates` in order against vault `vault_id`, stopping at the
/// first that opens it.
///
/// # Errors
///
/// - [`VaultError::NotFound`] for an unknown vault.
/// - [`VaultError::Database`] if the vault cannot be loaded.
///
/// Wrong candidates are not errors; they only advance the count.
pub fn recover_vault<I, C>(
    conn: &Connection,
    vault_id: &str,
    candidates: I,
) -> Result<SearchOutcome<C>, VaultError>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let record = get_vault_record(conn, vault_id)?;
    let target = SearchTarget {
        nonce: &record.nonce,
        ciphertext: &record.ciphertext,
        salt: &record.kdf_salt,
        context: &record.kdf_context,
    };

    tracing::info!(%vault_id, strategy = %record.strategy, "starting recovery search");
    let outcome = search(&target, &record.strategy, candidates);
    match &outcome {
        SearchOutcome::Found { index, .. } => {
            tracing::info!(%vault_id, candidate_index = index, "recovery candidate matched");
        }
        SearchOutcome::Exhausted { tried } => {
            tracing::info!(%vault_id, tried, "recovery candidates exhausted");
        }
    }
    Ok(outcome)
}

/// Read one candidate per line from `path`.
///
/// Trailing `\r` is stripped and blank lines are skipped. Candidates are
/// zeroized when dropped.
///
/// # Errors
///
/// Returns [`VaultError::Io`] if the file cannot be opened or read.
pub fn load_candidates(path: &Path) -> Result<Vec<Zeroizing<String>>, VaultError> {
    let reader = BufReader::new(File::open(path)?);
    let mut candidates = Vec::new();
    for line in reader.lines() {
        let mut line = Zeroizing::new(line?);
        if line.ends_with('\r') {
            line.pop();
        }
        if !line.is_empty() {
            candidates.push(line);
        }
    }
    Ok(candidates)
}
