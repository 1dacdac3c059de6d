//! Signed service credentials for privileged (internal) callers.
//!
//! A privileged caller proves itself with a token minted from the service
//! signing key, never with a caller-asserted flag:
//!
//! ```text
//! <service>.<expires_at unix secs>.<hex HMAC-SHA256 tag>
//! ```
//!
//! The tag covers a domain-separation prefix, the service name, and the
//! expiry. Verification uses `ring::hmac::verify` (constant time).

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use ring::hmac;
use std::fmt;

use crate::error::CryptoError;

/// Minimum signing key length in bytes.
pub const SIGNING_KEY_MIN_LEN: usize = 32;

/// Domain separation prefix mixed into every tag.
const TOKEN_DOMAIN: &[u8] = b"keyward-service-token-v1\0";

/// A verified service identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    /// Name of the internal service the token was issued to.
    pub service: String,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: u64,
}

/// Issues and verifies service tokens under one HMAC key.
pub struct ServiceCredentials {
    key: hmac::Key,
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceCredentials(***)")
    }
}

impl ServiceCredentials {
    /// Build from the configured signing key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` if the key is shorter than
    /// [`SIGNING_KEY_MIN_LEN`].
    pub fn new(signing_key: &[u8]) -> Result<Self, CryptoError> {
        if signing_key.len() < SIGNING_KEY_MIN_LEN {
            return Err(CryptoError::InvalidKeyLength(signing_key.len()));
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, signing_key),
        })
    }

    /// Mint a token for `service` valid until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedInput` if the service name is empty or
    /// contains a `.`.
    pub fn issue(&self, service: &str, expires_at: u64) -> Result<String, CryptoError> {
        if service.is_empty() || service.contains('.') {
            return Err(CryptoError::MalformedInput(
                "service name must be non-empty and must not contain '.'".into(),
            ));
        }
        let tag = hmac::sign(&self.key, &signed_message(service, expires_at));
        Ok(format!(
            "{service}.{expires_at}.{}",
            HEXLOWER.encode(tag.as_ref())
        ))
    }

    /// Verify `token` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidCredential` for a malformed, forged, or
    /// expired token. The cause is not reported.
    pub fn verify(&self, token: &str, now: u64) -> Result<ServiceToken, CryptoError> {
        let mut parts = token.splitn(3, '.');
        let (Some(service), Some(expiry), Some(tag_hex)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidCredential);
        };
        if service.is_empty() {
            return Err(CryptoError::InvalidCredential);
        }
        let expires_at: u64 = expiry.parse().map_err(|_| CryptoError::InvalidCredential)?;
        let tag = HEXLOWER_PERMISSIVE
            .decode(tag_hex.as_bytes())
            .map_err(|_| CryptoError::InvalidCredential)?;

        hmac::verify(&self.key, &signed_message(service, expires_at), &tag)
            .map_err(|_| CryptoError::InvalidCredential)?;

        if now >= expires_at {
            return Err(CryptoError::InvalidCredential);
        }

        Ok(ServiceToken {
            service: service.to_string(),
            expires_at,
        })
    }
}

fn signed_message(service: &str, expires_at: u64) -> Vec<u8> {
    let expiry = expires_at.to_string();
    let mut msg = Vec::with_capacity(
        TOKEN_DOMAIN
            .len()
            .saturating_add(service.len())
            .saturating_add(expiry.len())
            .saturating_add(1),
    );
    msg.extend_from_slice(TOKEN_DOMAIN);
    msg.extend_from_slice(service.as_bytes());
    msg.push(b'.');
    msg.extend_from_slice(expiry.as_bytes());
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x5A; 32];

    #[test]
    fn issued_token_verifies() {
        let creds = ServiceCredentials::new(&KEY).unwrap();
        let token = creds.issue("reconciler", 2_000).unwrap();
        let verified = creds.verify(&token, 1_000).unwrap();
        assert_eq!(verified.service, "reconciler");
        assert_eq!(verified.expires_at, 2_000);
    }

    #[test]
    fn expired_token_is_rejected() {
        let creds = ServiceCredentials::new(&KEY).unwrap();
        let token = creds.issue("reconciler", 2_000).unwrap();
        assert!(matches!(
            creds.verify(&token, 2_000),
            Err(CryptoError::InvalidCredential)
        ));
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let issuer = ServiceCredentials::new(&[0x11; 32]).unwrap();
        let verifier = ServiceCredentials::new(&KEY).unwrap();
        let token = issuer.issue("reconciler", 2_000).unwrap();
        assert!(verifier.verify(&token, 1_000).is_err());
    }

    #[test]
    fn altered_service_or_expiry_is_rejected() {
        let creds = ServiceCredentials::new(&KEY).unwrap();
        let token = creds.issue("reconciler", 2_000).unwrap();
        let renamed = token.replacen("reconciler", "admin", 1);
        let extended = token.replacen("2000", "9000", 1);
        assert!(creds.verify(&renamed, 1_000).is_err());
        assert!(creds.verify(&extended, 1_000).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let creds = ServiceCredentials::new(&KEY).unwrap();
        for token in ["", "true", "svc", "svc.123", ".123.00", "svc.abc.00", "svc.1.zz"] {
            assert!(creds.verify(token, 0).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn short_signing_key_is_rejected() {
        assert!(matches!(
            ServiceCredentials::new(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn issue_rejects_dotted_service_names() {
        let creds = ServiceCredentials::new(&KEY).unwrap();
        assert!(creds.issue("a.b", 10).is_err());
        assert!(creds.issue("", 10).is_err());
    }
}
