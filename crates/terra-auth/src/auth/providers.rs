//! Identity provider for pre-issued Google credentials
//!
//! Used when a Google ID token was obtained elsewhere (a browser session,
//! `gcloud auth print-identity-token`, CI secrets) and only needs to be
//! managed here.

use super::provider::{IdentityProvider, ProviderStatus, SignInResponse, TokenReloader};
use super::refresh::OAuthRefresher;
use super::types::{IdTokenClaims, SignInError, TokenRecord};
use crate::settings::AuthSettings;
use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use tracing::{debug, info};

/// Credentials handed to [`CredentialsProvider`]
#[derive(Debug, Clone, Default)]
pub struct ProvidedCredentials {
    pub id_token: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl ProvidedCredentials {
    /// Read `TERRA_ID_TOKEN`, `TERRA_ACCESS_TOKEN` and `TERRA_REFRESH_TOKEN`
    pub fn from_env() -> Option<Self> {
        let id_token = env::var("TERRA_ID_TOKEN").ok().filter(|t| !t.is_empty())?;
        info!("Found TERRA_ID_TOKEN in environment");

        Some(Self {
            id_token,
            access_token: env::var("TERRA_ACCESS_TOKEN").ok(),
            refresh_token: env::var("TERRA_REFRESH_TOKEN").ok(),
        })
    }
}

/// Provider that "signs in" with credentials it was given
pub struct CredentialsProvider {
    credentials: Option<ProvidedCredentials>,
    settings: AuthSettings,
    http: reqwest::Client,
}

impl CredentialsProvider {
    pub fn new(credentials: Option<ProvidedCredentials>, settings: AuthSettings) -> Self {
        Self {
            credentials,
            http: reqwest::Client::builder()
                .timeout(settings.request_timeout())
                .build()
                .unwrap_or_default(),
            settings,
        }
    }

    /// Provider over [`ProvidedCredentials::from_env`]
    pub fn from_env(settings: AuthSettings) -> Self {
        Self::new(ProvidedCredentials::from_env(), settings)
    }

    fn reloader(&self, credentials: &ProvidedCredentials) -> Option<Arc<dyn TokenReloader>> {
        let refresh_token = credentials.refresh_token.as_deref()?;
        let refresher = OAuthRefresher::new(
            self.http.clone(),
            self.settings.token_endpoint.clone(),
            self.settings.client_id.clone(),
            refresh_token,
        )
        .with_client_secret(self.settings.client_secret.clone());
        Some(Arc::new(refresher))
    }
}

#[async_trait]
impl IdentityProvider for CredentialsProvider {
    fn status(&self) -> ProviderStatus {
        if self.settings.client_id.trim().is_empty() {
            ProviderStatus::Failed("OAuth client id is not configured".to_string())
        } else {
            ProviderStatus::Ready
        }
    }

    async fn sign_in(&self) -> Result<SignInResponse, SignInError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SignInError::SignInFailed("no Google credentials were provided".to_string())
        })?;

        let claims = IdTokenClaims::decode(&credentials.id_token)
            .map_err(|e| SignInError::SignInFailed(e.to_string()))?;
        debug!("Decoded ID token for subject {}", claims.sub);

        let token = TokenRecord {
            id_token: credentials.id_token.clone(),
            access_token: credentials.access_token.clone().unwrap_or_default(),
            expires_at: claims.expires_at(),
        };

        Ok(SignInResponse {
            profile: claims.profile(),
            token,
            reloader: self.reloader(credentials),
        })
    }

    async fn sign_out(&self) -> Result<(), SignInError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "Credentials"
    }
}
