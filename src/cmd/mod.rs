//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`validate`]. Each handler lives in its
//! own submodule.

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::BroadcastError;

pub async fn dispatch(cli: Cli) -> Result<(), BroadcastError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  broadcaster v{version}: HTTP broadcast dispatcher\n\n  \
         No command provided. To get started:\n\n    \
         broadcaster run                   Start (auto-detects ./broadcaster.yaml)\n    \
         broadcaster run -c shadow.yaml    Start with a specific config file\n    \
         broadcaster validate shadow.yaml  Check a config without starting\n    \
         broadcaster --help                See all commands and options\n"
    );
}
