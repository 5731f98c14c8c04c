//! Registration gate over a signed-in coordinator

mod common;

use async_trait::async_trait;
use common::*;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terra_auth::{
    AuthError, AuthResult, MemoryStorage, RegistrationGate, RegistrationStatus, UserRegistry,
};

#[derive(Default)]
struct CountingRegistry {
    checks: AtomicUsize,
    registrations: AtomicUsize,
    registered: AtomicBool,
    fail_next: AtomicBool,
    tokens: Mutex<Vec<String>>,
}

impl CountingRegistry {
    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRegistry for CountingRegistry {
    async fn is_registered(&self, token: &str) -> AuthResult<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Network("sam unavailable".to_string()));
        }
        Ok(self.registered.load(Ordering::SeqCst))
    }

    async fn register(&self, _token: &str) -> AuthResult<()> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_not_signed_in() {
    let provider = Arc::new(FakeProvider::ready());
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    let registry = Arc::new(CountingRegistry::default());
    let gate = RegistrationGate::new(registry.clone());

    assert_eq!(
        gate.ensure_registered(&coordinator).await,
        RegistrationStatus::NotSignedIn
    );
    assert_eq!(registry.checks(), 0);
}

#[tokio::test]
async fn test_concurrent_callers_check_once() {
    let provider = Arc::new(FakeProvider::ready());
    provider.push_success(profile("ada"), fresh_token("t"), None);
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    coordinator.sign_in().await;

    let registry = Arc::new(CountingRegistry::default());
    let gate = RegistrationGate::new(registry.clone());

    let results = join_all((0..5).map(|_| gate.ensure_registered(&coordinator))).await;

    assert!(results
        .iter()
        .all(|status| *status == RegistrationStatus::Registered));
    assert_eq!(registry.checks(), 1);
    assert_eq!(registry.registrations(), 1);
}

#[tokio::test]
async fn test_existing_user_is_not_registered_again() {
    let provider = Arc::new(FakeProvider::ready());
    provider.push_success(profile("ada"), fresh_token("t"), None);
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    coordinator.sign_in().await;

    let registry = Arc::new(CountingRegistry::default());
    registry.registered.store(true, Ordering::SeqCst);
    let gate = RegistrationGate::new(registry.clone());

    assert_eq!(
        gate.ensure_registered(&coordinator).await,
        RegistrationStatus::Registered
    );
    assert_eq!(registry.registrations(), 0);
}

#[tokio::test]
async fn test_failure_is_retried() {
    let provider = Arc::new(FakeProvider::ready());
    provider.push_success(profile("ada"), fresh_token("t"), None);
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    coordinator.sign_in().await;

    let registry = Arc::new(CountingRegistry::default());
    registry.fail_next.store(true, Ordering::SeqCst);
    let gate = RegistrationGate::new(registry.clone());

    assert!(matches!(
        gate.ensure_registered(&coordinator).await,
        RegistrationStatus::Failed(AuthError::Network(_))
    ));
    assert_eq!(
        gate.ensure_registered(&coordinator).await,
        RegistrationStatus::Registered
    );
    assert_eq!(registry.checks(), 2);
}

#[tokio::test]
async fn test_new_identity_is_checked() {
    let provider = Arc::new(FakeProvider::ready());
    provider.push_success(profile("ada"), fresh_token("a"), None);
    provider.push_success(profile("bob"), fresh_token("b"), None);
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    let registry = Arc::new(CountingRegistry::default());
    let gate = RegistrationGate::new(registry.clone());

    coordinator.sign_in().await;
    gate.ensure_registered(&coordinator).await;
    gate.ensure_registered(&coordinator).await;
    assert_eq!(registry.checks(), 1);

    coordinator.sign_in().await;
    gate.ensure_registered(&coordinator).await;
    assert_eq!(registry.checks(), 2);
}

#[tokio::test]
async fn test_identity_switch_during_refresh_is_recorded_for_new_user() {
    let provider = Arc::new(FakeProvider::ready());
    let reloader = FakeReloader::ok(fresh_token("ada-refreshed"), Duration::from_millis(100));
    provider.push_success(profile("ada"), expired_token("ada-stale"), Some(reloader));
    provider.push_success(profile("bob"), fresh_token("bob-token"), None);
    let coordinator = coordinator(&provider, &MemoryStorage::new());
    coordinator.sign_in().await;

    let registry = Arc::new(CountingRegistry::default());
    let gate = Arc::new(RegistrationGate::new(registry.clone()));

    let pending = {
        let gate = gate.clone();
        let coordinator = coordinator.clone();
        tokio::spawn(async move { gate.ensure_registered(&coordinator).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    coordinator.sign_in().await;

    assert_eq!(pending.await.unwrap(), RegistrationStatus::Registered);
    assert_eq!(registry.tokens(), vec!["bob-token".to_string()]);

    // Recorded under bob, so bob is not checked again
    assert_eq!(
        gate.ensure_registered(&coordinator).await,
        RegistrationStatus::Registered
    );
    assert_eq!(registry.checks(), 1);
}
