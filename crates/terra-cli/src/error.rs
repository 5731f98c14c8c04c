//! Error types for the Terra CLI

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file issues
    #[error("Configuration error: {0}")]
    Config(#[from] terra_common::ConfigurationError),

    /// Authentication failures reported by the coordinator
    #[error(transparent)]
    Auth(#[from] terra_auth::AuthError),

    #[error("Not signed in. Run 'terra login' first.")]
    NotSignedIn,

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
