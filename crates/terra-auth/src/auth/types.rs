//! Authentication-related types and data structures
//!
//! Profiles, token records, ID token claims and the error types shared by
//! the coordinator and its adapters.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use terra_common::auth_constants::{DEFAULT_TOKEN_LIFETIME_SECS, POPUP_CLOSED_BY_USER};

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Basic profile of the signed-in Google account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Stable Google subject identifier
    pub id: String,
    pub email: String,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub image_url: String,
}

/// Token bundle issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// ID token presented to Terra services
    pub id_token: String,
    /// OAuth access token
    pub access_token: String,
    /// Literal expiry instant reported by the provider
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Create a record that expires `expires_in` from now
    pub fn new(
        id_token: impl Into<String>,
        access_token: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        Self {
            id_token: id_token.into(),
            access_token: access_token.into(),
            expires_at: Utc::now()
                .checked_add_signed(to_chrono(expires_in))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// True when the token expires within `margin` of now.
    ///
    /// A token is expired once `expires_at - margin <= now`.
    pub fn is_expired(&self, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(to_chrono(margin))
            .map_or(true, |deadline| deadline <= Utc::now())
    }

    /// Time left before the literal deadline, zero if already passed
    pub fn time_until_expiry(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or_default()
    }
}

fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}

/// Claims of a Google ID token that Terra cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    /// Expiry as a Unix timestamp
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Decode the payload of a JWT without verifying its signature.
    ///
    /// The token was handed to us by the identity provider; Terra services
    /// verify it on every request.
    pub fn decode(token: &str) -> AuthResult<Self> {
        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::InvalidToken(
                    "ID token is not a three-part JWT".to_string(),
                ))
            }
        };

        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT payload encoding: {e}")))?;

        serde_json::from_slice(&decoded)
            .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT claims: {e}")))
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            given_name: self.given_name.clone(),
            family_name: self.family_name.clone(),
            image_url: self.picture.clone(),
        }
    }

    /// Expiry from the `exp` claim, or the default Google lifetime from now
    pub fn expires_at(&self) -> DateTime<Utc> {
        let default_lifetime = ChronoDuration::seconds(DEFAULT_TOKEN_LIFETIME_SECS as i64);
        self.exp
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
            .unwrap_or_else(|| Utc::now() + default_lifetime)
    }
}

/// Failures reported by the identity provider's interactive flows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignInError {
    /// The user dismissed the account picker
    #[error("Sign-in cancelled by user")]
    UserCancelled,

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),
}

impl SignInError {
    /// Classify a provider failure reason
    pub fn from_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason == POPUP_CLOSED_BY_USER {
            Self::UserCancelled
        } else {
            Self::SignInFailed(reason)
        }
    }
}

/// Authentication errors
///
/// `Clone` so that one refresh failure can be handed to every caller that
/// joined the refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Identity provider misconfigured (e.g. missing OAuth client id)
    #[error("Identity provider failed to initialize: {0}")]
    Initialization(String),

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    /// Silent token refresh failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid OAuth response: {0}")]
    InvalidResponse(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Auth storage error: {0}")]
    Storage(String),

    #[error("Registration failed: {0}")]
    Registration(String),
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization error: {err}"))
    }
}
