use crate::cli::{commands::Commands, handlers};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::PathBuf;
use terra_auth::AuthSettings;
use terra_common::ConfigLoader;

/// Terra CLI - Google sign-in and ID tokens for Terra services
#[derive(Parser, Debug)]
#[command(
    name = "terra",
    version,
    about = "Terra CLI - Google sign-in and ID tokens for Terra services",
    long_about = "Sign in to Terra with Google credentials and print ID tokens.

Credentials are read from TERRA_ID_TOKEN, TERRA_ACCESS_TOKEN and
TERRA_REFRESH_TOKEN. Settings come from terra.toml (or --config) and
TERRA_AUTH_* environment variables.

EXAMPLES:
  terra login                       # Sign in and check Sam registration
  terra status --json               # Show the cached session
  terra token                       # Print an ID token for curl -H
  terra logout                      # Forget the cached session"
)]
pub struct Args {
    /// Configuration file path (defaults to ./terra.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let settings = load_settings(self.config)?;

        match self.command {
            Commands::Login => handlers::auth::handle_login(&settings).await,
            Commands::Logout => handlers::auth::handle_logout(&settings).await,
            Commands::Status { json } => handlers::auth::handle_status(&settings, json).await,
            Commands::Token => handlers::auth::handle_token(&settings).await,
            Commands::Config { defaults } => handlers::config::handle_config(&settings, defaults),
        }
    }
}

/// Load and validate settings from the file (if any) and environment
pub fn load_settings(config: Option<PathBuf>) -> Result<AuthSettings> {
    let settings = AuthSettings::load(config)?;
    settings.validate()?;
    Ok(settings)
}
