//! Authentication command handlers

use crate::error::{CliError, Result};
use crate::output::{display_path, note, print_json, problem, success};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use terra_auth::{
    AuthCoordinator, AuthSettings, AuthStatus, AuthStorage, CredentialsProvider, FileStorage,
    IdentityProvider, ProvidedCredentials, RegistrationGate, RegistrationStatus, SamRegistry,
};
use tracing::{debug, info, warn};

/// Session cache for the configured data dir, or the platform default
pub fn storage_for(settings: &AuthSettings) -> Result<FileStorage> {
    match &settings.data_dir {
        Some(dir) => Ok(FileStorage::new(dir)),
        None => Ok(FileStorage::with_default_dir()?),
    }
}

/// Build and hydrate a coordinator
pub fn build_coordinator(
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn AuthStorage>,
    settings: &AuthSettings,
) -> AuthCoordinator {
    let coordinator =
        AuthCoordinator::new(provider, storage).with_safety_margin(settings.safety_margin());
    coordinator.initialize();
    coordinator
}

struct Session {
    coordinator: AuthCoordinator,
    storage: FileStorage,
    credentials: Option<ProvidedCredentials>,
}

fn open_session(settings: &AuthSettings) -> Result<Session> {
    let storage = storage_for(settings)?;
    debug!("Using session cache at {}", storage.dir().display());

    let credentials = ProvidedCredentials::from_env();
    let provider = Arc::new(CredentialsProvider::new(credentials.clone(), settings.clone()));
    let coordinator = build_coordinator(provider, Arc::new(storage.clone()), settings);

    Ok(Session {
        coordinator,
        storage,
        credentials,
    })
}

/// Handle login command
pub async fn handle_login(settings: &AuthSettings) -> Result<()> {
    let session = open_session(settings)?;
    let coordinator = &session.coordinator;

    if let Some(err) = coordinator.error() {
        return Err(err.into());
    }

    coordinator.sign_in().await;
    if let Some(err) = coordinator.error() {
        return Err(err.into());
    }
    let Some(profile) = coordinator.profile() else {
        return Err(CliError::NotSignedIn);
    };
    success(&format!("Signed in as {}", profile.email));

    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?;
    let gate = RegistrationGate::new(Arc::new(SamRegistry::new(
        http,
        settings.sam_base_url.clone(),
    )));

    match gate.ensure_registered(coordinator).await {
        RegistrationStatus::Registered => note("Terra user registration confirmed"),
        RegistrationStatus::NotSignedIn => debug!("Session ended before registration check"),
        RegistrationStatus::Failed(e) => {
            // Sign-in stands; registration is retried on the next login
            warn!("Registration check failed: {}", e);
            problem(&format!("Could not confirm Terra registration: {e}"));
        }
    }

    Ok(())
}

/// Handle logout command
pub async fn handle_logout(settings: &AuthSettings) -> Result<()> {
    let session = open_session(settings)?;
    let signed_in = session.coordinator.profile().is_some();

    session.coordinator.sign_out().await;

    if signed_in {
        success("Signed out");
    } else {
        note("You are not currently signed in.");
    }
    Ok(())
}

/// Serializable view of the session for `terra status`
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: AuthStatus,
    pub loaded: bool,
    pub expired: bool,
    pub can_refresh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn from_coordinator(coordinator: &AuthCoordinator) -> Self {
        let snapshot = coordinator.snapshot();
        Self {
            status: snapshot.status,
            loaded: snapshot.loaded,
            expired: snapshot.expired,
            can_refresh: coordinator.can_refresh(),
            email: snapshot.profile.as_ref().map(|p| p.email.clone()),
            name: snapshot.profile.map(|p| p.name),
            expires_at: coordinator.token_record().map(|t| t.expires_at),
            error: snapshot.error.map(|e| e.to_string()),
        }
    }
}

/// Handle status command
pub async fn handle_status(settings: &AuthSettings, json: bool) -> Result<()> {
    let session = open_session(settings)?;
    let report = StatusReport::from_coordinator(&session.coordinator);

    if json {
        return print_json(&report);
    }

    let who = report.email.as_deref().unwrap_or("unknown user");
    match report.status {
        AuthStatus::Authenticated => success(&format!("Signed in as {who}")),
        AuthStatus::Expired => {
            problem(&format!("Session for {who} has expired"));
            note("Run 'terra login' to sign in again");
        }
        AuthStatus::Unauthenticated => note("Not signed in"),
        AuthStatus::Authenticating | AuthStatus::Refreshing => {
            note("Authentication in progress")
        }
    }

    if let Some(expires_at) = report.expires_at {
        println!("  Token expires: {}", expires_at.to_rfc3339());
    }
    println!("  Session cache: {}", display_path(session.storage.dir()));
    if let Some(error) = &report.error {
        problem(error);
    }
    Ok(())
}

/// Handle token command
pub async fn handle_token(settings: &AuthSettings) -> Result<()> {
    let session = open_session(settings)?;
    let coordinator = &session.coordinator;

    // Reloaders do not survive a restart; a refresh token in the
    // environment lets a fresh sign-in provide one again.
    let has_refresh_token = session
        .credentials
        .as_ref()
        .is_some_and(|c| c.refresh_token.is_some());
    if coordinator.expired() && !coordinator.can_refresh() && has_refresh_token {
        info!("Cached token expired, signing in again to obtain a reloader");
        coordinator.sign_in().await;
    }

    let token = coordinator.get_auth_token().await;
    if token.is_empty() {
        return Err(coordinator
            .error()
            .map(CliError::from)
            .unwrap_or(CliError::NotSignedIn));
    }

    if coordinator.expired() {
        problem("Token has expired; run 'terra login' to sign in again");
    }
    println!("{token}");
    Ok(())
}
