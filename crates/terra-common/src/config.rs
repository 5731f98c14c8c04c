//! Layered configuration loading
//!
//! Every configuration type resolves the same way: compiled-in defaults,
//! then a TOML file, then environment variables carrying a prefix and using
//! `__` as the nesting separator.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Loader implemented by every configuration root.
pub trait ConfigLoader: Serialize + DeserializeOwned + Default {
    /// Environment prefix, e.g. `TERRA_AUTH_`
    const ENV_PREFIX: &'static str;

    /// File consulted when no explicit path is given
    const DEFAULT_FILE: &'static str;

    /// Load from `path`, or from [`Self::DEFAULT_FILE`] when `None`.
    fn load(path: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let path = path.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_FILE));
        Self::load_from_file(&path)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(Self::ENV_PREFIX).split("__")),
        )
    }

    /// Render the defaults as TOML
    fn generate_example() -> Result<String, ConfigurationError> {
        Self::default().to_toml()
    }

    fn to_toml(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }
}

fn extract<T: DeserializeOwned>(figment: Figment) -> Result<T, ConfigurationError> {
    figment.extract().map_err(|e| ConfigurationError::ParseError {
        details: e.to_string(),
    })
}
