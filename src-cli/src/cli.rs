//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use keyward_vault::CONFIG_FILE;

/// Keyward: custody vault for wallet private keys.
#[derive(Parser, Debug)]
#[command(name = "keyward", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, env = "KEYWARD_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `KEYWARD_LOG`
    /// takes precedence.
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a configuration file and create the database.
    Init(InitArgs),
    /// Manage wallets.
    #[command(subcommand)]
    Wallet(WalletCommand),
    /// Seal a private key (read from stdin) into a wallet's vault.
    Import(ImportArgs),
    /// Re-seal a vault under a new derivation method.
    Rotate(RotateArgs),
    /// Decrypt a vault for an authenticated caller.
    Decrypt(DecryptArgs),
    /// Delete a user's wallets that have no vault.
    Reconcile {
        /// Owner whose wallets are reconciled.
        #[arg(long)]
        user: String,
    },
    /// Search a candidate list for a vault's derivation input.
    Recover(RecoverArgs),
    /// Mint a privileged service token.
    IssueToken {
        /// Service name embedded in the token.
        #[arg(long)]
        service: String,
        /// Lifetime in seconds.
        #[arg(long, default_value_t = 300)]
        ttl: u64,
    },
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
    /// Generate a random shared secret and static key as well as the
    /// service signing key.
    #[arg(long)]
    pub generate_secrets: bool,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Register a wallet address for a user.
    Add {
        #[arg(long)]
        user: String,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "")]
        label: String,
    },
    /// List a user's wallets.
    List {
        #[arg(long)]
        user: String,
    },
    /// Change a wallet's label.
    Rename {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        label: String,
    },
    /// Delete a wallet and its vault.
    Delete {
        #[arg(long)]
        wallet: String,
    },
}

/// Derivation method for a new vault.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// PBKDF2-HMAC-SHA256 over a password.
    Password,
    /// HKDF-SHA256 over the configured shared secret.
    SharedSecret,
    /// The configured static key.
    StaticKey,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub wallet: String,
    #[arg(long, value_enum, default_value_t = MethodArg::Password)]
    pub method: MethodArg,
    /// Password for `--method password`.
    #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    #[arg(long)]
    pub vault: String,
    /// Current password, for password vaults.
    #[arg(long, env = "KEYWARD_OLD_PASSWORD", hide_env_values = true)]
    pub old_password: Option<String>,
    #[arg(long, value_enum)]
    pub method: MethodArg,
    /// New password for `--method password`.
    #[arg(long, env = "KEYWARD_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecryptArgs {
    #[arg(long)]
    pub vault: String,
    /// Ciphertext override (hex or base64, optional `hex:`/`base64:` prefix).
    #[arg(long)]
    pub ciphertext: Option<String>,
    /// Nonce override (hex or base64, optional `hex:`/`base64:` prefix).
    #[arg(long)]
    pub nonce: Option<String>,
    #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Session token of the calling user.
    #[arg(long, env = "KEYWARD_SESSION", hide_env_values = true)]
    pub session: Option<String>,
    /// Service token of the calling service.
    #[arg(long, env = "KEYWARD_SERVICE_TOKEN", hide_env_values = true)]
    pub service_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct RecoverArgs {
    #[arg(long)]
    pub vault: String,
    /// File with one candidate per line.
    #[arg(long)]
    pub candidates: PathBuf,
    /// Print the matching candidate and the recovered private key.
    #[arg(long)]
    pub reveal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_wallet_command() {
        let cli = Cli::try_parse_from([
            "keyward", "wallet", "add", "--user", "alice", "--address", "0xabc",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Wallet(WalletCommand::Add { ref user, .. }) if user == "alice"
        ));
    }

    #[test]
    fn method_values_are_kebab_case() {
        let cli = Cli::try_parse_from([
            "keyward", "rotate", "--vault", "v1", "--method", "shared-secret",
        ])
        .unwrap();
        let Command::Rotate(args) = cli.command else {
            panic!("expected rotate");
        };
        assert_eq!(args.method, MethodArg::SharedSecret);
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["keyward", "-vv", "reconcile", "--user", "u"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
