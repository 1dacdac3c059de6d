use std::process::ExitCode;

use clap::Parser;
use keyward::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = keyward::logging::init(cli.verbose);

    if let Err(e) = keyward_crypto_core::disable_core_dumps() {
        tracing::warn!(error = %e, "could not disable core dumps");
    }

    keyward::run(cli)
}
