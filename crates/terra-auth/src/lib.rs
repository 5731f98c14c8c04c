//! Authentication state and token refresh for Terra clients
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use terra_auth::{AuthCoordinator, AuthSettings, CredentialsProvider, FileStorage};
//!
//! # async fn example() -> terra_auth::AuthResult<()> {
//! let settings = AuthSettings::default();
//! let coordinator = Arc::new(AuthCoordinator::new(
//!     Arc::new(CredentialsProvider::from_env(settings.clone())),
//!     Arc::new(FileStorage::with_default_dir()?),
//! ));
//! coordinator.initialize();
//! coordinator.sign_in().await;
//! let token = coordinator.get_auth_token().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod registration;
pub mod settings;

pub use auth::{
    AuthCoordinator, AuthError, AuthResult, AuthSnapshot, AuthStatus, AuthStorage,
    CredentialsProvider, FileStorage, IdentityProvider, MemoryStorage, Profile,
    ProvidedCredentials, ProviderStatus, SignInError, SignInResponse, TokenRecord, TokenReloader,
};
pub use registration::{RegistrationGate, RegistrationStatus, SamRegistry, UserRegistry};
pub use settings::AuthSettings;
