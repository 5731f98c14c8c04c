//! Token refresh against the Google OAuth token endpoint
//!
//! [`OAuthRefresher`] is the [`TokenReloader`] handed out by providers that
//! hold a refresh token.

use super::provider::TokenReloader;
use super::types::{AuthError, AuthResult, TokenRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use terra_common::auth_constants::DEFAULT_TOKEN_LIFETIME_SECS;
use tracing::{debug, info};

/// Silent refresh using an OAuth refresh token
pub struct OAuthRefresher {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: Option<String>,
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<u64>,
}

impl OAuthRefresher {
    pub fn new(
        http: reqwest::Client,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: None,
            refresh_token: refresh_token.into(),
        }
    }

    /// Installed-app clients send their secret alongside the refresh token
    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret;
        self
    }

    /// Exchange the refresh token for a new token record
    pub async fn refresh(&self) -> AuthResult<TokenRecord> {
        debug!("Refreshing ID token at {}", self.token_endpoint);

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse token response: {e}"))
        })?;

        let access_token = parsed.access_token.ok_or_else(|| {
            AuthError::InvalidResponse("Missing access_token in response".to_string())
        })?;
        let id_token = parsed.id_token.unwrap_or_else(|| access_token.clone());
        let expires_in =
            Duration::from_secs(parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));

        info!("Token refresh completed");
        Ok(TokenRecord::new(id_token, access_token, expires_in))
    }
}

#[async_trait]
impl TokenReloader for OAuthRefresher {
    async fn reload(&self) -> AuthResult<TokenRecord> {
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refresher(server: &MockServer) -> OAuthRefresher {
        OAuthRefresher::new(
            reqwest::Client::new(),
            format!("{}/token", server.uri()),
            "client-123",
            "refresh-abc",
        )
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-abc"))
            .and(body_string_contains("client_id=client-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "id_token": "new-id",
                "expires_in": 3599,
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = refresher(&server).reload().await.unwrap();
        assert_eq!(record.id_token, "new-id");
        assert_eq!(record.access_token, "new-access");
        assert!(!record.is_expired(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_refresh_sends_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "only-access",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = refresher(&server)
            .with_client_secret(Some("s3cret".to_string()))
            .refresh()
            .await
            .unwrap();
        assert_eq!(record.id_token, "only-access");
    }

    #[tokio::test]
    async fn test_refresh_rejected_by_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
            })))
            .mount(&server)
            .await;

        let err = refresher(&server).refresh().await.unwrap_err();
        match err {
            AuthError::RefreshFailed(message) => assert!(message.contains("invalid_grant")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": "x" })))
            .mount(&server)
            .await;

        let err = refresher(&server).refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }
}
