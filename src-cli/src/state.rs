//! Process state assembled from configuration at startup.
//!
//! Secrets flow one way: configuration → [`KeyDeriver`] / [`AccessGate`].
//! Commands receive the assembled [`AppContext`] and never read the
//! configuration file or the environment themselves.

use std::path::{Path, PathBuf};

use keyward_crypto_core::kdf::KeyDeriver;
use keyward_vault::{AccessGate, KeywardConfig, StaticSessions, VaultDb, VaultError};

/// Everything a command needs.
#[derive(Debug)]
pub struct AppContext {
    pub db: VaultDb,
    pub deriver: KeyDeriver,
    pub gate: AccessGate<StaticSessions>,
}

impl AppContext {
    /// Load `config_path` (with environment overrides), validate it, and
    /// open the database.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] for invalid configuration.
    /// - [`VaultError::Database`] / [`VaultError::Migration`] if the
    ///   database cannot be opened.
    pub fn load(config_path: &Path) -> Result<Self, VaultError> {
        let config = KeywardConfig::load(config_path)?;
        Self::from_config(config, config_path)
    }

    /// Assemble from an already-loaded configuration. A relative
    /// `databasePath` is resolved against the directory of `config_path`.
    ///
    /// # Errors
    ///
    /// See [`AppContext::load`].
    pub fn from_config(config: KeywardConfig, config_path: &Path) -> Result<Self, VaultError> {
        config.validate()?;

        let db_path = resolve_database_path(&config, config_path);
        let db = VaultDb::open(&db_path)?;
        let deriver = config.key_deriver()?;
        let gate = AccessGate::new(
            config.session_resolver(),
            config.service_credentials()?,
            config.gate_policy(),
        );

        tracing::debug!(
            database = %db_path.display(),
            shared_secret = deriver.material().has_shared_secret(),
            static_key = deriver.material().has_static_key(),
            "custody context ready"
        );

        Ok(Self { db, deriver, gate })
    }
}

/// Database path from `config`, relative paths anchored at the config file.
#[must_use]
pub fn resolve_database_path(config: &KeywardConfig, config_path: &Path) -> PathBuf {
    if config.database_path.is_absolute() {
        return config.database_path.clone();
    }
    config_path
        .parent()
        .map_or_else(|| config.database_path.clone(), |dir| dir.join(&config.database_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_database_path_is_anchored_at_config_dir() {
        let config = KeywardConfig::default();
        let resolved = resolve_database_path(&config, Path::new("/etc/keyward/keyward.json"));
        assert_eq!(resolved, PathBuf::from("/etc/keyward/keyward.db"));
    }

    #[test]
    fn absolute_database_path_is_kept() {
        let mut config = KeywardConfig::default();
        config.database_path = PathBuf::from("/var/lib/keyward.db");
        let resolved = resolve_database_path(&config, Path::new("/etc/keyward/keyward.json"));
        assert_eq!(resolved, PathBuf::from("/var/lib/keyward.db"));
    }

    #[test]
    fn bare_config_name_uses_current_dir() {
        let config = KeywardConfig::default();
        let resolved = resolve_database_path(&config, Path::new("keyward.json"));
        assert_eq!(resolved, PathBuf::from("keyward.db"));
    }

    #[test]
    fn invalid_config_is_rejected_before_opening_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = KeywardConfig::default();
        config.static_key = Some("hex:00".into());
        let err = AppContext::from_config(config, &dir.path().join("keyward.json")).unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
        assert!(!dir.path().join("keyward.db").exists());
    }
}
