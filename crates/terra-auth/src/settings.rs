//! Authentication settings
//!
//! Loaded through [`ConfigLoader`]: defaults, then `terra.toml` (or an
//! explicit file), then `TERRA_AUTH_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use terra_common::auth_constants::{GOOGLE_TOKEN_ENDPOINT, SAM_BASE_URL, TOKEN_SAFETY_MARGIN_SECS};
use terra_common::{ConfigLoader, ConfigurationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Google OAuth client id; sign-in is unavailable while empty
    pub client_id: String,

    /// Client secret for installed-app OAuth clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// OAuth token endpoint used for silent refresh
    pub token_endpoint: String,

    /// Base URL of Sam, used for user registration
    pub sam_base_url: String,

    /// Where the cached session lives; platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Tokens count as expired this many seconds early
    pub safety_margin_secs: u64,

    /// Timeout for token endpoint and Sam requests
    pub request_timeout_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            sam_base_url: SAM_BASE_URL.to_string(),
            data_dir: None,
            safety_margin_secs: TOKEN_SAFETY_MARGIN_SECS,
            request_timeout_secs: 30,
        }
    }
}

impl AuthSettings {
    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (key, value) in [
            ("token_endpoint", &self.token_endpoint),
            ("sam_base_url", &self.sam_base_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigurationError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

impl ConfigLoader for AuthSettings {
    const ENV_PREFIX: &'static str = "TERRA_AUTH_";
    const DEFAULT_FILE: &'static str = "terra.toml";
}
