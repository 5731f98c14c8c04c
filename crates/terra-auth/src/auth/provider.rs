//! Identity provider boundary
//!
//! The coordinator never performs an OAuth handshake itself. It asks an
//! [`IdentityProvider`] for a signed-in session and keeps the
//! [`TokenReloader`] the provider hands back for silent refreshes.

use super::types::{AuthResult, Profile, SignInError, TokenRecord};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Initialization state reported by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Still loading; authenticated calls must wait
    Initializing,
    Ready,
    /// Unusable, e.g. the OAuth client id is missing
    Failed(String),
}

/// Capability to mint a fresh token without user interaction.
///
/// Only valid for the lifetime of the process that signed in.
#[async_trait]
pub trait TokenReloader: Send + Sync {
    async fn reload(&self) -> AuthResult<TokenRecord>;
}

/// Successful interactive sign-in
#[derive(Clone)]
pub struct SignInResponse {
    pub profile: Profile,
    pub token: TokenRecord,
    pub reloader: Option<Arc<dyn TokenReloader>>,
}

impl fmt::Debug for SignInResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInResponse")
            .field("profile", &self.profile)
            .field("expires_at", &self.token.expires_at)
            .field("reloader", &self.reloader.is_some())
            .finish()
    }
}

/// Core trait for identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn status(&self) -> ProviderStatus;

    /// Run the interactive sign-in flow.
    ///
    /// May take as long as the user does; the provider enforces its own
    /// timeouts and reports them as [`SignInError::SignInFailed`].
    async fn sign_in(&self) -> Result<SignInResponse, SignInError>;

    async fn sign_out(&self) -> Result<(), SignInError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
