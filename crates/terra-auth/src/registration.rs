//! User registration with Sam
//!
//! Every Terra user needs a Sam record before other services accept their
//! token. [`RegistrationGate`] checks for the record, creates it when
//! missing, and remembers the outcome per identity so the check runs once.

use crate::auth::coordinator::AuthCoordinator;
use crate::auth::types::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Backend holding user registrations
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Whether the bearer of `token` already has a user record
    async fn is_registered(&self, token: &str) -> AuthResult<bool>;

    /// Create the user record for the bearer of `token`
    async fn register(&self, token: &str) -> AuthResult<()>;
}

/// [`UserRegistry`] backed by Sam's self-registration API
pub struct SamRegistry {
    http: reqwest::Client,
    base_url: String,
}

impl SamRegistry {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn self_url(&self, suffix: &str) -> String {
        format!("{}/register/user/v2/self{}", self.base_url, suffix)
    }
}

#[async_trait]
impl UserRegistry for SamRegistry {
    async fn is_registered(&self, token: &str) -> AuthResult<bool> {
        let response = self
            .http
            .get(self.self_url("/info"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Sam registration check failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthError::Registration(format!(
                    "registration check returned {status}: {body}"
                )))
            }
        }
    }

    async fn register(&self, token: &str) -> AuthResult<()> {
        let response = self
            .http
            .post(self.self_url(""))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Sam registration failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => {
                debug!("User already registered in Sam");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthError::Registration(format!(
                    "registration returned {status}: {body}"
                )))
            }
        }
    }
}

/// Outcome of [`RegistrationGate::ensure_registered`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    NotSignedIn,
    Registered,
    Failed(AuthError),
}

/// Checks and creates the signed-in user's record once per identity
pub struct RegistrationGate {
    registry: Arc<dyn UserRegistry>,
    registered: Mutex<HashSet<String>>,
}

impl RegistrationGate {
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self {
            registry,
            registered: Mutex::new(HashSet::new()),
        }
    }

    /// Make sure the coordinator's current identity is registered.
    ///
    /// Concurrent calls wait for the first one. Failures are not remembered,
    /// so the next call retries.
    pub async fn ensure_registered(&self, coordinator: &AuthCoordinator) -> RegistrationStatus {
        let Some(profile) = coordinator.profile() else {
            return RegistrationStatus::NotSignedIn;
        };

        let mut registered = self.registered.lock().await;
        if registered.contains(&profile.id) {
            return RegistrationStatus::Registered;
        }

        let token = coordinator.get_auth_token().await;
        if token.is_empty() {
            return RegistrationStatus::NotSignedIn;
        }

        // The session may have changed hands during a refresh; the token
        // belongs to whoever is signed in now.
        let Some(profile) = coordinator.profile() else {
            return RegistrationStatus::NotSignedIn;
        };
        if registered.contains(&profile.id) {
            debug!("Session switched to already registered user {}", profile.email);
            return RegistrationStatus::Registered;
        }

        match self.check_or_create(&token).await {
            Ok(()) => {
                info!("User {} is registered", profile.email);
                registered.insert(profile.id);
                RegistrationStatus::Registered
            }
            Err(e) => {
                warn!("Registration for {} failed: {}", profile.email, e);
                RegistrationStatus::Failed(e)
            }
        }
    }

    async fn check_or_create(&self, token: &str) -> AuthResult<()> {
        if self.registry.is_registered(token).await? {
            return Ok(());
        }
        info!("No user record found, registering");
        self.registry.register(token).await
    }
}
