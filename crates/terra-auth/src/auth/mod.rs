//! Authentication for Terra
//!
//! This module provides:
//! - The [`AuthCoordinator`] owning profile, token and refresh state
//! - The identity provider boundary and a credentials-based provider
//! - Silent refresh against the Google OAuth token endpoint
//! - Durable storage of the cached session

pub mod coordinator;
pub mod provider;
pub mod providers;
pub mod refresh;
pub mod token_store;
pub mod types;

pub use coordinator::{AuthCoordinator, AuthSnapshot, AuthStatus};
pub use provider::{IdentityProvider, ProviderStatus, SignInResponse, TokenReloader};
pub use providers::{CredentialsProvider, ProvidedCredentials};
pub use refresh::OAuthRefresher;
pub use token_store::{AuthStorage, FileStorage, MemoryStorage};
pub use types::{AuthError, AuthResult, IdTokenClaims, Profile, SignInError, TokenRecord};
