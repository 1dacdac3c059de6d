//! `keyward`: operator CLI over the custody vault.
//!
//! Every command prints one JSON document on stdout. Failures print
//! `{"error": ..., "status": ...}` on stderr and exit non-zero (see
//! [`commands::CommandError::exit_code`]).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod state;

use std::io::BufRead;
use std::process::ExitCode;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use zeroize::Zeroizing;

use keyward_vault::{current_epoch_secs, KeywardConfig, VaultError};

use crate::cli::{Cli, Command, WalletCommand};
use crate::commands::{err_json, CommandError};
use crate::state::AppContext;

fn to_json<T: Serialize>(dto: &T) -> Result<Value, CommandError> {
    serde_json::to_value(dto).map_err(|e| {
        VaultError::Config(format!("cannot serialize command output: {e}")).into()
    })
}

/// First line of `input`, without its line ending.
fn read_private_key<R: BufRead>(mut input: R) -> Result<SecretString, CommandError> {
    let mut line = Zeroizing::new(String::new());
    input.read_line(&mut line).map_err(VaultError::from)?;
    let key = line.trim_end_matches(['\r', '\n']);
    Ok(SecretString::from(key.to_owned()))
}

/// Run one parsed command. `stdin` supplies the private key for `import`.
///
/// # Errors
///
/// Returns the [`CommandError`] to print, with its status.
pub fn execute<R: BufRead>(cli: Cli, stdin: R) -> Result<Value, CommandError> {
    let config_path = cli.config;

    match cli.command {
        Command::Init(args) => to_json(&commands::init::init(&config_path, &args, |name| {
            std::env::var(name).ok()
        })?),
        Command::IssueToken { service, ttl } => {
            let config = KeywardConfig::load(&config_path)?;
            to_json(&commands::token::issue_token(
                &config,
                &service,
                ttl,
                current_epoch_secs(),
            )?)
        }
        command => {
            let ctx = AppContext::load(&config_path)?;
            dispatch(&ctx, command, stdin)
        }
    }
}

fn dispatch<R: BufRead>(ctx: &AppContext, command: Command, stdin: R) -> Result<Value, CommandError> {
    match command {
        Command::Wallet(WalletCommand::Add {
            user,
            address,
            label,
        }) => to_json(&commands::wallet::add(ctx, &user, &address, &label)?),
        Command::Wallet(WalletCommand::List { user }) => {
            to_json(&commands::wallet::list(ctx, &user)?)
        }
        Command::Wallet(WalletCommand::Rename { wallet, label }) => {
            to_json(&commands::wallet::rename(ctx, &wallet, &label)?)
        }
        Command::Wallet(WalletCommand::Delete { wallet }) => {
            to_json(&commands::wallet::delete(ctx, &wallet)?)
        }
        Command::Import(args) => {
            let method = commands::vaults::import_method(args.method, args.password)?;
            let private_key = read_private_key(stdin)?;
            to_json(&commands::vaults::import(
                ctx,
                &args.user,
                &args.wallet,
                private_key,
                method,
            )?)
        }
        Command::Rotate(args) => {
            let method = commands::vaults::import_method(args.method, args.new_password)?;
            to_json(&commands::vaults::rotate(
                ctx,
                &args.vault,
                args.old_password,
                &method,
            )?)
        }
        Command::Decrypt(args) => to_json(&commands::decrypt::decrypt(
            ctx,
            args,
            current_epoch_secs(),
        )?),
        Command::Reconcile { user } => to_json(&commands::reconcile::reconcile(ctx, &user)?),
        Command::Recover(args) => to_json(&commands::recover::recover(ctx, &args)?),
        Command::Init(_) | Command::IssueToken { .. } => Err(CommandError::bad_request(
            "command does not use the custody context",
        )),
    }
}

/// Execute `cli` against the process stdin and print the outcome.
#[must_use]
pub fn run(cli: Cli) -> ExitCode {
    let stdin = std::io::stdin();
    match execute(cli, stdin.lock()) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot render output");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{}", err_json(&err));
            ExitCode::from(err.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn private_key_line_ending_is_stripped() {
        let key = read_private_key(&b"deadbeef\r\nignored\n"[..]).unwrap();
        assert_eq!(key.expose_secret(), "deadbeef");
    }

    #[test]
    fn empty_stdin_gives_empty_key() {
        let key = read_private_key(&b""[..]).unwrap();
        assert!(key.expose_secret().is_empty());
    }
}
