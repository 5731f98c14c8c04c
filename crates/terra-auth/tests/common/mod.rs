//! Scripted identity provider and reloader for coordinator tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terra_auth::{
    AuthCoordinator, AuthError, AuthResult, IdentityProvider, MemoryStorage, Profile,
    ProviderStatus, SignInError, SignInResponse, TokenRecord, TokenReloader,
};

pub fn profile(id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        email: format!("{id}@example.org"),
        name: "Test User".to_string(),
        given_name: "Test".to_string(),
        family_name: "User".to_string(),
        image_url: "https://example.org/avatar.png".to_string(),
    }
}

/// Token expiring `secs` seconds from now (negative for the past)
pub fn token_expiring_in(id_token: &str, secs: i64) -> TokenRecord {
    TokenRecord {
        id_token: id_token.to_string(),
        access_token: format!("access-for-{id_token}"),
        expires_at: Utc::now() + ChronoDuration::seconds(secs),
    }
}

pub fn fresh_token(id_token: &str) -> TokenRecord {
    token_expiring_in(id_token, 3600)
}

pub fn expired_token(id_token: &str) -> TokenRecord {
    token_expiring_in(id_token, -10)
}

pub fn success(
    profile: Profile,
    token: TokenRecord,
    reloader: Option<Arc<FakeReloader>>,
) -> Result<SignInResponse, SignInError> {
    Ok(SignInResponse {
        profile,
        token,
        reloader: reloader.map(|r| r as Arc<dyn TokenReloader>),
    })
}

pub struct FakeReloader {
    calls: AtomicUsize,
    delay: Duration,
    result: AuthResult<TokenRecord>,
}

impl FakeReloader {
    pub fn ok(token: TokenRecord, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            result: Ok(token),
        })
    }

    pub fn failing(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            result: Err(AuthError::Network("token endpoint unreachable".to_string())),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenReloader for FakeReloader {
    async fn reload(&self) -> AuthResult<TokenRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

pub struct FakeProvider {
    status: Mutex<ProviderStatus>,
    responses: Mutex<VecDeque<(Result<SignInResponse, SignInError>, Duration)>>,
    sign_in_delay: Duration,
    sign_outs: AtomicUsize,
    fail_sign_out: bool,
}

impl FakeProvider {
    pub fn ready() -> Self {
        Self::with_status(ProviderStatus::Ready)
    }

    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status: Mutex::new(status),
            responses: Mutex::new(VecDeque::new()),
            sign_in_delay: Duration::ZERO,
            sign_outs: AtomicUsize::new(0),
            fail_sign_out: false,
        }
    }

    pub fn sign_in_delay(mut self, delay: Duration) -> Self {
        self.sign_in_delay = delay;
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    pub fn set_status(&self, status: ProviderStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Script the next sign-in, delayed by the provider's default delay
    pub fn push(&self, response: Result<SignInResponse, SignInError>) {
        self.push_delayed(response, self.sign_in_delay);
    }

    /// Script the next sign-in to resolve after `delay`
    pub fn push_delayed(&self, response: Result<SignInResponse, SignInError>, delay: Duration) {
        self.responses.lock().unwrap().push_back((response, delay));
    }

    pub fn push_success(
        &self,
        profile: Profile,
        token: TokenRecord,
        reloader: Option<Arc<FakeReloader>>,
    ) {
        self.push(success(profile, token, reloader));
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn status(&self) -> ProviderStatus {
        self.status.lock().unwrap().clone()
    }

    async fn sign_in(&self) -> Result<SignInResponse, SignInError> {
        let scripted = self.responses.lock().unwrap().pop_front();
        let (response, delay) = scripted.unwrap_or_else(|| {
            (
                Err(SignInError::SignInFailed(
                    "no scripted response".to_string(),
                )),
                self.sign_in_delay,
            )
        });
        tokio::time::sleep(delay).await;
        response
    }

    async fn sign_out(&self) -> Result<(), SignInError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            Err(SignInError::SignInFailed("revocation failed".to_string()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "Fake"
    }
}

pub fn coordinator(provider: &Arc<FakeProvider>, storage: &MemoryStorage) -> Arc<AuthCoordinator> {
    let coordinator = AuthCoordinator::new(provider.clone(), Arc::new(storage.clone()));
    coordinator.initialize();
    Arc::new(coordinator)
}
