//! `keyward init`.

use std::path::Path;

use keyward_crypto_core::SecretBytes;
use keyward_vault::{encode_hex, KeywardConfig, VaultDb, VaultError};
use serde::Serialize;

use super::CommandError;
use crate::cli::InitArgs;
use crate::state::resolve_database_path;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDto {
    pub config_path: String,
    pub database_path: String,
    pub schema_version: i32,
    /// Which secrets were generated. Their values are only in the file.
    pub generated: Vec<&'static str>,
}

fn random_hex_secret() -> Result<String, VaultError> {
    let bytes = SecretBytes::<32>::random()?;
    Ok(format!("hex:{}", encode_hex(bytes.expose())))
}

/// Write a fresh configuration to `config_path` and create the database.
///
/// Settings returned by `lookup` for the `KEYWARD_*` variables are kept; a
/// service signing key is always generated when none is set.
///
/// # Errors
///
/// - `409` if `config_path` exists and `--force` was not given.
/// - `500` if the file or database cannot be written.
pub fn init<F>(config_path: &Path, args: &InitArgs, lookup: F) -> Result<InitDto, CommandError>
where
    F: Fn(&str) -> Option<String>,
{
    if config_path.exists() && !args.force {
        return Err(VaultError::Conflict(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ))
        .into());
    }

    let mut config = KeywardConfig::default();
    config.apply_overrides(lookup)?;

    let mut generated = Vec::new();
    if config.service_signing_key.is_none() {
        config.service_signing_key = Some(random_hex_secret()?);
        generated.push("serviceSigningKey");
    }
    if args.generate_secrets {
        if config.shared_secret.is_none() {
            config.shared_secret = Some(random_hex_secret()?);
            generated.push("sharedSecret");
        }
        if config.static_key.is_none() {
            config.static_key = Some(random_hex_secret()?);
            generated.push("staticKey");
        }
    }
    config.validate()?;

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(VaultError::from)?;
    }
    config.save(config_path)?;

    let db_path = resolve_database_path(&config, config_path);
    let db = VaultDb::open(&db_path)?;
    let schema_version = db.schema_version()?;

    tracing::info!(
        config = %config_path.display(),
        database = %db_path.display(),
        schema_version,
        "keyward initialized"
    );

    Ok(InitDto {
        config_path: config_path.display().to_string(),
        database_path: db_path.display().to_string(),
        schema_version,
        generated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn init_writes_config_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.json");
        let args = InitArgs {
            force: false,
            generate_secrets: true,
        };

        let dto = init(&path, &args, no_env).unwrap();
        assert_eq!(
            dto.schema_version,
            i32::try_from(VaultDb::latest_schema_version()).unwrap()
        );
        assert_eq!(
            dto.generated,
            vec!["serviceSigningKey", "sharedSecret", "staticKey"]
        );

        let config = KeywardConfig::from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.key_material().unwrap().has_static_key());
        assert!(dir.path().join("keyward.db").exists());
    }

    #[test]
    fn existing_config_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.json");
        let mut args = InitArgs {
            force: false,
            generate_secrets: false,
        };
        init(&path, &args, no_env).unwrap();

        assert_eq!(init(&path, &args, no_env).unwrap_err().status, 409);
        args.force = true;
        assert!(init(&path, &args, no_env).is_ok());
    }

    #[test]
    fn secrets_from_environment_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.json");
        let key = format!("hex:{}", "11".repeat(32));
        let env_key = key.clone();
        let lookup = move |name: &str| {
            (name == "KEYWARD_SERVICE_SIGNING_KEY").then(|| env_key.clone())
        };
        let args = InitArgs {
            force: false,
            generate_secrets: false,
        };

        let dto = init(&path, &args, lookup).unwrap();
        assert!(dto.generated.is_empty());
        let config = KeywardConfig::from_file(&path).unwrap();
        assert_eq!(config.service_signing_key.as_deref(), Some(key.as_str()));
        assert!(config.shared_secret.is_none());
    }
}
