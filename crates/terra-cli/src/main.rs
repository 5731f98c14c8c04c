//! Main entry point for the Terra CLI

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use terra_cli::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    // Logging stays off unless -v or RUST_LOG asks for it
    terra_common::logging::init_cli_logging(&args.verbosity, "terra=info,terra_auth=info")
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run().await?)
}
