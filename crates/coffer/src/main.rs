//! coffer - multi-tenant secret store

use clap::Parser;
use coffer::cli::{Cli, Command};
use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Check(cmd) => cmd.run().await,
        Command::Users(cmd) => cmd.run().await,
        Command::Keygen(cmd) => cmd.run(),
    }
}
