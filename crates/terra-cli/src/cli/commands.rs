use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Sign in with credentials from the environment
    Login,

    /// Sign out and remove the cached session
    Logout,

    /// Show the current authentication state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a usable ID token, refreshing it if needed
    Token,

    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        defaults: bool,
    },
}
