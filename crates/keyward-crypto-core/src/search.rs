//! Candidate search over a sealed vault whose derivation input is unknown.
//!
//! The GCM tag is the oracle: a candidate is correct exactly when the key it
//! derives authenticates the ciphertext. Candidates are tried strictly in
//! order and the iterator is only advanced until the first success, so the
//! reported candidate is always the earliest match.

use crate::kdf::DerivationStrategy;
use crate::memory::SecretBuffer;
use crate::symmetric;

/// The sealed material and derivation parameters of one vault.
#[derive(Debug, Clone, Copy)]
pub struct SearchTarget<'a> {
    /// 96-bit nonce stored with the vault.
    pub nonce: &'a [u8],
    /// `ciphertext || tag` stored with the vault.
    pub ciphertext: &'a [u8],
    /// Salt passed to the strategy for every candidate.
    pub salt: &'a [u8],
    /// Context passed to the strategy for every candidate.
    pub context: &'a [u8],
}

/// Result of a search.
#[derive(Debug)]
pub enum SearchOutcome<C> {
    /// A candidate opened the vault.
    Found {
        /// The recovered plaintext.
        plaintext: SecretBuffer,
        /// The winning candidate.
        candidate: C,
        /// Zero-based position of the candidate in the input order.
        index: usize,
    },
    /// No candidate opened the vault.
    Exhausted {
        /// Number of candidates tried.
        tried: usize,
    },
}

impl<C> SearchOutcome<C> {
    /// Returns `true` for [`SearchOutcome::Found`].
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Number of candidates evaluated, including the winner.
    #[must_use]
    pub fn tried(&self) -> usize {
        match self {
            Self::Found { index, .. } => index.saturating_add(1),
            Self::Exhausted { tried } => *tried,
        }
    }
}

/// Try each candidate as the derivation input until one authenticates.
///
/// Derivation errors and malformed-input errors count as a failed candidate,
/// exactly like an authentication failure; nothing aborts the search.
pub fn search<I, C>(
    target: &SearchTarget<'_>,
    strategy: &DerivationStrategy,
    candidates: I,
) -> SearchOutcome<C>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut tried = 0usize;
    for candidate in candidates {
        let index = tried;
        tried = tried.saturating_add(1);

        let Ok(key) = strategy.derive(candidate.as_ref(), target.salt, target.context) else {
            continue;
        };
        if let Ok(plaintext) = symmetric::open(key.expose(), target.nonce, target.ciphertext) {
            return SearchOutcome::Found {
                plaintext,
                candidate,
                index,
            };
        }
    }
    SearchOutcome::Exhausted { tried }
}
