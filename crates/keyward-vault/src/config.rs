//! Process configuration: `keyward.json` plus `KEYWARD_*` overrides.
//!
//! Loaded once at startup. The secrets it carries (shared secret, static
//! key, service signing key) are turned into [`KeyMaterial`] and
//! [`ServiceCredentials`] here and injected into the components that need
//! them; nothing else reads configuration.
//!
//! Secret values are text in hex or base64 (see [`crate::encoding`]).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use keyward_crypto_core::kdf::{KeyDeriver, KeyMaterial, DERIVED_KEY_LEN};
use keyward_crypto_core::{SecretBuffer, ServiceCredentials, SIGNING_KEY_MIN_LEN};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::access::{GatePolicy, StaticSessions};
use crate::encoding::decode_field;
use crate::error::VaultError;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "keyward.json";

const ENV_DATABASE_PATH: &str = "KEYWARD_DATABASE_PATH";
const ENV_SHARED_SECRET: &str = "KEYWARD_SHARED_SECRET";
const ENV_STATIC_KEY: &str = "KEYWARD_STATIC_KEY";
const ENV_SERVICE_SIGNING_KEY: &str = "KEYWARD_SERVICE_SIGNING_KEY";
const ENV_ALLOW_SHARED_SECRET: &str = "KEYWARD_ALLOW_SHARED_SECRET_FOR_USERS";

// ── Top-level configuration ────────────────────────────────────────

/// Keyward configuration.
///
/// Secret fields are zeroized on drop and masked in `Debug`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeywardConfig {
    /// `SQLite` database holding wallets and vaults.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Input keying material for `hkdf-sha256` vaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,

    /// Raw AES key (at least 32 bytes) for `static-key` vaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_key: Option<String>,

    /// HMAC key for privileged service tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_signing_key: Option<String>,

    /// Whether end users may decrypt `hkdf-sha256` vaults.
    #[serde(default)]
    pub allow_shared_secret_for_users: bool,

    /// Session token → user ID, for deployments without an external
    /// session service.
    #[serde(default)]
    pub sessions: BTreeMap<String, String>,
}

impl Default for KeywardConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            shared_secret: None,
            static_key: None,
            service_signing_key: None,
            allow_shared_secret_for_users: false,
            sessions: BTreeMap::new(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("keyward.db")
}

impl fmt::Debug for KeywardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("KeywardConfig")
            .field("database_path", &self.database_path)
            .field("shared_secret", &mask(&self.shared_secret))
            .field("static_key", &mask(&self.static_key))
            .field("service_signing_key", &mask(&self.service_signing_key))
            .field(
                "allow_shared_secret_for_users",
                &self.allow_shared_secret_for_users,
            )
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl Drop for KeywardConfig {
    fn drop(&mut self) {
        self.shared_secret.zeroize();
        self.static_key.zeroize();
        self.service_signing_key.zeroize();
        for mut token in std::mem::take(&mut self.sessions).into_keys() {
            token.zeroize();
        }
    }
}

// ── Loading ────────────────────────────────────────────────────────

impl KeywardConfig {
    /// Load `path`, then apply `KEYWARD_*` environment overrides.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Io`] if the file exists but cannot be read.
    /// - [`VaultError::Config`] if the JSON is invalid or an override is
    ///   malformed.
    pub fn load(path: &Path) -> Result<Self, VaultError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse `path` without consulting the environment.
    ///
    /// # Errors
    ///
    /// See [`KeywardConfig::load`].
    pub fn from_file(path: &Path) -> Result<Self, VaultError> {
        match fs::read_to_string(path) {
            Ok(mut contents) => {
                let parsed = serde_json::from_str(&contents).map_err(|e| {
                    VaultError::Config(format!("{}: {e}", path.display()))
                });
                contents.zeroize();
                parsed
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    /// Apply overrides from `lookup`, a stand-in for the environment.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the boolean override is not one of
    /// `true`, `false`, `1`, `0`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), VaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(secret) = lookup(ENV_SHARED_SECRET) {
            self.shared_secret = Some(secret);
        }
        if let Some(key) = lookup(ENV_STATIC_KEY) {
            self.static_key = Some(key);
        }
        if let Some(key) = lookup(ENV_SERVICE_SIGNING_KEY) {
            self.service_signing_key = Some(key);
        }
        if let Some(flag) = lookup(ENV_ALLOW_SHARED_SECRET) {
            self.allow_shared_secret_for_users = match flag.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(VaultError::Config(format!(
                        "{ENV_ALLOW_SHARED_SECRET} must be true or false, got {other:?}"
                    )))
                }
            };
        }
        Ok(())
    }

    /// Persist to `path` (write to a temp file, then rename), owner-only on
    /// Unix.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if the directory does not exist or the
    /// write or rename fails.
    pub fn save(&self, path: &Path) -> Result<(), VaultError> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("cannot serialize configuration: {e}")))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(CONFIG_FILE);
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));

        let written = fs::write(&tmp, &json);
        json.zeroize();
        written?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, path)?;
        Ok(())
    }

    // ── Validation and injection ───────────────────────────────────

    /// Check that every configured secret decodes and has a usable length.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), VaultError> {
        self.key_material()?;
        self.service_credentials()?;
        Ok(())
    }

    /// Key material for the non-password strategies.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if a secret does not decode, the shared
    /// secret is empty, or the static key is shorter than 32 bytes.
    pub fn key_material(&self) -> Result<KeyMaterial, VaultError> {
        let mut material = KeyMaterial::new();

        if let Some(secret) = &self.shared_secret {
            let bytes = decode_secret("sharedSecret", secret)?;
            if bytes.is_empty() {
                return Err(VaultError::Config("sharedSecret is empty".into()));
            }
            material = material.with_shared_secret(bytes);
        }

        if let Some(key) = &self.static_key {
            let bytes = decode_secret("staticKey", key)?;
            if bytes.len() < DERIVED_KEY_LEN {
                return Err(VaultError::Config(format!(
                    "staticKey must be at least {DERIVED_KEY_LEN} bytes, got {}",
                    bytes.len()
                )));
            }
            material = material.with_static_key(bytes);
        }

        Ok(material)
    }

    /// A [`KeyDeriver`] bound to [`KeywardConfig::key_material`].
    ///
    /// # Errors
    ///
    /// See [`KeywardConfig::key_material`].
    pub fn key_deriver(&self) -> Result<KeyDeriver, VaultError> {
        Ok(KeyDeriver::new(self.key_material()?))
    }

    /// Token issuer and verifier, if a signing key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the key does not decode or is shorter
    /// than [`SIGNING_KEY_MIN_LEN`].
    pub fn service_credentials(&self) -> Result<Option<ServiceCredentials>, VaultError> {
        let Some(key) = &self.service_signing_key else {
            return Ok(None);
        };
        let bytes = decode_secret("serviceSigningKey", key)?;
        ServiceCredentials::new(bytes.expose())
            .map(Some)
            .map_err(|_| {
                VaultError::Config(format!(
                    "serviceSigningKey must be at least {SIGNING_KEY_MIN_LEN} bytes"
                ))
            })
    }

    /// Access policy derived from configuration.
    #[must_use]
    pub const fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            allow_shared_secret_for_users: self.allow_shared_secret_for_users,
        }
    }

    /// In-memory session table built from `sessions`.
    #[must_use]
    pub fn session_resolver(&self) -> StaticSessions {
        self.sessions
            .iter()
            .map(|(token, user)| (token.clone(), user.clone()))
            .collect()
    }
}

fn decode_secret(field: &str, value: &str) -> Result<SecretBuffer, VaultError> {
    decode_field(field, value)
        .map(SecretBuffer::from_vec)
        .map_err(|_| VaultError::Config(format!("{field} is not valid hex or base64")))
}

// ── Tests ──────────────────────────────────────────────────────────
