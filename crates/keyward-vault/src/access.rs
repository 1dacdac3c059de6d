//! Access gate: who is calling, and may they open this vault?
//!
//! Two kinds of caller reach the decrypt path:
//!
//! - end users, identified by an authenticated session resolved through a
//!   [`SessionResolver`];
//! - privileged internal services, identified by an HMAC-signed service
//!   token checked against the configured [`ServiceCredentials`].
//!
//! A request that carries a service token is judged on that token alone.
//! If the token is forged or expired the request fails; it does not fall
//! back to the session.

use std::collections::HashMap;

use keyward_crypto_core::kdf::DerivationStrategy;
use keyward_crypto_core::ServiceCredentials;

use crate::error::VaultError;
use crate::store::VaultRecord;

// ----- Sessions -----

/// Authenticated-session lookup, provided by the hosting application.
pub trait SessionResolver {
    /// The user behind `session`, or `None` if it is unknown or expired.
    fn current_user(&self, session: &str) -> Option<String>;
}

/// In-memory session table.
#[derive(Default)]
pub struct StaticSessions {
    sessions: HashMap<String, String>,
}

impl StaticSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` as belonging to `user_id`.
    pub fn insert(&mut self, session: impl Into<String>, user_id: impl Into<String>) {
        self.sessions.insert(session.into(), user_id.into());
    }
}

impl FromIterator<(String, String)> for StaticSessions {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            sessions: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for StaticSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSessions")
            .field("count", &self.sessions.len())
            .finish()
    }
}

impl SessionResolver for StaticSessions {
    fn current_user(&self, session: &str) -> Option<String> {
        self.sessions.get(session).cloned()
    }
}

// ----- Caller identity -----

/// Credentials presented with a request. Both fields are optional; at least
/// one must verify.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRequest<'a> {
    pub session: Option<&'a str>,
    pub service_token: Option<&'a str>,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// A signed-in user.
    EndUser(String),
    /// An internal service holding a valid service token.
    Privileged {
        /// Service name carried in the token.
        service: String,
    },
}

impl Caller {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EndUser(_) => "user",
            Self::Privileged { .. } => "service",
        }
    }
}

/// Which strategies end users may exercise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatePolicy {
    /// Allow end users to open `hkdf-sha256` vaults.
    pub allow_shared_secret_for_users: bool,
}

// ----- Gate -----

/// Authorizes decrypt requests.
#[derive(Debug)]
pub struct AccessGate<S> {
    sessions: S,
    credentials: Option<ServiceCredentials>,
    policy: GatePolicy,
}

impl<S: SessionResolver> AccessGate<S> {
    /// Build a gate. Without `credentials`, no request can be privileged.
    pub const fn new(
        sessions: S,
        credentials: Option<ServiceCredentials>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            sessions,
            credentials,
            policy,
        }
    }

    /// The active policy.
    pub const fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Identify the caller. `now` is Unix seconds, used for token expiry.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] when the service token is
    /// present but invalid, or when no token is present and the session is
    /// missing or unknown.
    pub fn authorize(&self, request: &AccessRequest<'_>, now: u64) -> Result<Caller, VaultError> {
        if let Some(token) = request.service_token {
            let credentials = self.credentials.as_ref().ok_or(VaultError::Unauthorized)?;
            let verified = credentials
                .verify(token, now)
                .map_err(|_| VaultError::Unauthorized)?;
            return Ok(Caller::Privileged {
                service: verified.service,
            });
        }

        request
            .session
            .and_then(|session| self.sessions.current_user(session))
            .map(Caller::EndUser)
            .ok_or(VaultError::Unauthorized)
    }

    /// May `caller` decrypt `record`?
    ///
    /// End users must own the vault and may use `pbkdf2-sha256`, plus
    /// `hkdf-sha256` when the policy allows it; `static-key` is reserved for
    /// privileged callers. Privileged callers may use any strategy.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] when any of those checks fail.
    pub fn check_decrypt(&self, caller: &Caller, record: &VaultRecord) -> Result<(), VaultError> {
        let Caller::EndUser(user_id) = caller else {
            return Ok(());
        };
        if *user_id != record.user_id {
            return Err(VaultError::Unauthorized);
        }
        match record.strategy {
            DerivationStrategy::Pbkdf2Sha256 { .. } => Ok(()),
            DerivationStrategy::HkdfSha256 if self.policy.allow_shared_secret_for_users => Ok(()),
            DerivationStrategy::HkdfSha256 | DerivationStrategy::StaticKey => {
                Err(VaultError::Unauthorized)
            }
        }
    }
}
