//! Authentication state with single-flight token refresh
//!
//! [`AuthCoordinator`] is the one place that knows whether the user is
//! signed in and how to get a usable ID token. Construct it once at start
//! and share it through an `Arc`.
//!
//! Public operations never fail. Failures land in [`AuthCoordinator::error`]
//! and callers of [`AuthCoordinator::get_auth_token`] see an empty string.

use super::provider::{IdentityProvider, ProviderStatus, TokenReloader};
use super::token_store::{AuthStorage, PROFILE_KEY, TOKEN_KEY};
use super::types::{AuthError, AuthResult, Profile, SignInError, TokenRecord};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use terra_common::auth_constants::TOKEN_SAFETY_MARGIN_SECS;
use tracing::{debug, info, warn};

type RefreshFuture = Shared<BoxFuture<'static, AuthResult<TokenRecord>>>;

/// Derived authentication state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated,
    /// Provider still loading, or an interactive sign-in is running
    Authenticating,
    Authenticated,
    /// Token past its deadline and no refresh running
    Expired,
    Refreshing,
}

/// Read-only view of the coordinator for rendering layers
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub loaded: bool,
    pub expired: bool,
    pub status: AuthStatus,
    pub profile: Option<Profile>,
    pub error: Option<AuthError>,
}

struct InFlightRefresh {
    id: u64,
    generation: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct AuthState {
    profile: Option<Profile>,
    token: Option<TokenRecord>,
    reloader: Option<Arc<dyn TokenReloader>>,
    error: Option<AuthError>,
    refresh: Option<InFlightRefresh>,
    /// Bumped whenever the session is replaced or torn down
    generation: u64,
    /// Bumped when a sign-out starts
    sign_outs: u64,
    /// Id of the most recently started sign-in
    latest_sign_in: u64,
    next_refresh_id: u64,
    pending_sign_ins: usize,
}

impl AuthState {
    fn reset(&mut self) {
        self.profile = None;
        self.token = None;
        self.reloader = None;
        self.refresh = None;
        self.generation += 1;
    }
}

/// Decrements the pending sign-in count even if the caller stops awaiting.
struct PendingSignIn<'a>(&'a Mutex<AuthState>);

impl Drop for PendingSignIn<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.pending_sign_ins = state.pending_sign_ins.saturating_sub(1);
    }
}

/// Owns the authentication state and coordinates token refresh
pub struct AuthCoordinator {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn AuthStorage>,
    safety_margin: Duration,
    state: Mutex<AuthState>,
}

impl AuthCoordinator {
    pub fn new(provider: Arc<dyn IdentityProvider>, storage: Arc<dyn AuthStorage>) -> Self {
        Self {
            provider,
            storage,
            safety_margin: Duration::from_secs(TOKEN_SAFETY_MARGIN_SECS),
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Override how long before the literal deadline a token counts as expired
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Hydrate from durable storage and pick up provider init failures.
    ///
    /// Does not touch the network.
    pub fn initialize(&self) {
        let mut state = self.state.lock();

        if let ProviderStatus::Failed(reason) = self.provider.status() {
            warn!("Identity provider {} failed to initialize: {}", self.provider.name(), reason);
            state.error = Some(AuthError::Initialization(reason));
        }

        if state.profile.is_some() {
            return;
        }

        match self.load_persisted() {
            Ok(Some((profile, token))) => {
                debug!("Restored cached session for {}", profile.email);
                state.profile = Some(profile);
                state.token = Some(token);
            }
            Ok(None) => debug!("No cached session"),
            Err(e) => {
                warn!("Discarding unreadable cached session: {}", e);
                self.clear_persisted();
            }
        }
    }

    /// Run the provider's interactive sign-in.
    ///
    /// The outcome is dropped if a sign-out or a newer sign-in started
    /// while this one was pending.
    pub async fn sign_in(&self) {
        let (attempt, sign_outs) = {
            let mut state = self.state.lock();
            state.pending_sign_ins += 1;
            state.latest_sign_in += 1;
            (state.latest_sign_in, state.sign_outs)
        };
        let pending = PendingSignIn(&self.state);

        info!("Starting sign-in {} with {}", attempt, self.provider.name());
        let result = self.provider.sign_in().await;
        drop(pending);

        let mut state = self.state.lock();
        if state.sign_outs != sign_outs || state.latest_sign_in != attempt {
            info!("Discarding outcome of superseded sign-in {}", attempt);
            return;
        }

        match result {
            Ok(response) => {
                state.reset();
                self.persist_session(&response.profile, &response.token);
                info!("Signed in as {}", response.profile.email);
                state.profile = Some(response.profile);
                state.token = Some(response.token);
                state.reloader = response.reloader;
                state.error = None;
            }
            Err(SignInError::UserCancelled) => {
                debug!("Sign-in cancelled by user");
                state.error = None;
            }
            Err(SignInError::SignInFailed(reason)) => {
                self.fail(&mut state, AuthError::SignInFailed(reason));
            }
        }
    }

    /// Sign out with the provider and forget every credential.
    ///
    /// A provider failure is logged; local state is cleared either way.
    pub async fn sign_out(&self) {
        self.state.lock().sign_outs += 1;

        if let Err(e) = self.provider.sign_out().await {
            warn!("Provider sign-out failed: {}", e);
        }

        let mut state = self.state.lock();
        state.reset();
        state.error = None;
        self.clear_persisted();
        info!("Signed out");
    }

    /// Return a usable ID token, refreshing at most once across callers.
    ///
    /// Returns an empty string when there is no session or the refresh
    /// failed. An expired token is returned as-is when no reloader exists.
    pub async fn get_auth_token(&self) -> String {
        let (future, generation, refresh_id) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let (expired, id_token) = match &state.token {
                None => return String::new(),
                Some(token) => (token.is_expired(self.safety_margin), token.id_token.clone()),
            };
            if !expired {
                return id_token;
            }

            match &state.refresh {
                Some(in_flight) => {
                    debug!("Joining in-flight token refresh");
                    (in_flight.future.clone(), in_flight.generation, in_flight.id)
                }
                None => {
                    let Some(reloader) = state.reloader.clone() else {
                        debug!("Token expired and no reloader available");
                        return id_token;
                    };

                    state.next_refresh_id += 1;
                    let in_flight = InFlightRefresh {
                        id: state.next_refresh_id,
                        generation: state.generation,
                        future: async move { reloader.reload().await }.boxed().shared(),
                    };
                    debug!("Starting token refresh {}", in_flight.id);
                    let joined = (in_flight.future.clone(), in_flight.generation, in_flight.id);
                    state.refresh = Some(in_flight);
                    joined
                }
            }
        };

        let result = future.await;
        self.complete_refresh(generation, refresh_id, result)
    }

    /// Apply a refresh outcome if it still belongs to the current session
    fn complete_refresh(
        &self,
        generation: u64,
        refresh_id: u64,
        result: AuthResult<TokenRecord>,
    ) -> String {
        let mut state = self.state.lock();

        if state.generation != generation {
            debug!("Ignoring refresh {} from a replaced session", refresh_id);
            return state
                .token
                .as_ref()
                .map(|token| token.id_token.clone())
                .unwrap_or_default();
        }

        let owns_refresh = state
            .refresh
            .as_ref()
            .is_some_and(|in_flight| in_flight.id == refresh_id);

        match result {
            Ok(token) => {
                if owns_refresh {
                    state.refresh = None;
                    self.persist_token(&token);
                    info!("Token refreshed, valid for {:?}", token.time_until_expiry());
                    let id_token = token.id_token.clone();
                    state.token = Some(token);
                    id_token
                } else {
                    token.id_token
                }
            }
            Err(err) => {
                if owns_refresh {
                    let err = match err {
                        AuthError::RefreshFailed(_) => err,
                        other => AuthError::RefreshFailed(other.to_string()),
                    };
                    self.fail(&mut state, err);
                }
                String::new()
            }
        }
    }

    /// True when the provider finished loading or an error occurred
    pub fn loaded(&self) -> bool {
        match self.provider.status() {
            ProviderStatus::Ready | ProviderStatus::Failed(_) => true,
            ProviderStatus::Initializing => self.state.lock().error.is_some(),
        }
    }

    /// True when the current token is within the safety margin of expiry
    pub fn expired(&self) -> bool {
        self.state
            .lock()
            .token
            .as_ref()
            .is_some_and(|token| token.is_expired(self.safety_margin))
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.lock().profile.clone()
    }

    pub fn error(&self) -> Option<AuthError> {
        self.state.lock().error.clone()
    }

    pub fn token_record(&self) -> Option<TokenRecord> {
        self.state.lock().token.clone()
    }

    /// Whether an expired token can be refreshed without user interaction
    pub fn can_refresh(&self) -> bool {
        self.state.lock().reloader.is_some()
    }

    pub fn status(&self) -> AuthStatus {
        let loaded = self.loaded();
        let state = self.state.lock();

        if !loaded || state.pending_sign_ins > 0 {
            return AuthStatus::Authenticating;
        }

        match &state.token {
            None => AuthStatus::Unauthenticated,
            Some(token) if token.is_expired(self.safety_margin) => {
                if state.refresh.is_some() {
                    AuthStatus::Refreshing
                } else {
                    AuthStatus::Expired
                }
            }
            Some(_) => AuthStatus::Authenticated,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            loaded: self.loaded(),
            expired: self.expired(),
            status: self.status(),
            profile: self.profile(),
            error: self.error(),
        }
    }

    fn fail(&self, state: &mut AuthState, err: AuthError) {
        warn!("Authentication failed, clearing session: {}", err);
        state.reset();
        state.error = Some(err);
        self.clear_persisted();
    }

    fn load_persisted(&self) -> AuthResult<Option<(Profile, TokenRecord)>> {
        let profile = self.storage.get(PROFILE_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;

        match (profile, token) {
            (Some(profile), Some(token)) => Ok(Some((
                serde_json::from_str(&profile)?,
                serde_json::from_str(&token)?,
            ))),
            (None, None) => Ok(None),
            _ => Err(AuthError::Storage(
                "cached profile and token are out of step".to_string(),
            )),
        }
    }

    fn persist_session(&self, profile: &Profile, token: &TokenRecord) {
        let result = serde_json::to_string(profile)
            .map_err(AuthError::from)
            .and_then(|json| self.storage.set(PROFILE_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist profile: {}", e);
        }
        self.persist_token(token);
    }

    fn persist_token(&self, token: &TokenRecord) {
        let result = serde_json::to_string(token)
            .map_err(AuthError::from)
            .and_then(|json| self.storage.set(TOKEN_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist token: {}", e);
        }
    }

    fn clear_persisted(&self) {
        for key in [PROFILE_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.delete(key) {
                warn!("Failed to remove {} from storage: {}", key, e);
            }
        }
    }
}
