//! Identity provider backed by a GoTrue-compatible auth server.
//!
//! The session lives in memory only; a restarted console starts signed out.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use garage_session::port::IdentityProvider;
use garage_session::{
    AuthChangeEvent, AuthEventBus, AuthEventKind, AuthSubscription, ProviderSession, ProviderUser, SessionError,
};

use crate::domain::repository::PasswordSignIn;

pub struct GoTrueProvider {
    client: Client,
    auth_url: String,
    api_key: String,
    session: Mutex<Option<ProviderSession>>,
    bus: AuthEventBus,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    /// Unix seconds.
    expires_at: Option<i64>,
    user: ProviderUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> ProviderSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                let secs = self.expires_in?;
                let at = chrono::Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
                if at.is_none() {
                    warn!(expires_in = secs, "token lifetime out of range; treating session as non-expiring");
                }
                at
            });
        ProviderSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// GoTrue reports errors in several shapes depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn describe(self, status: StatusCode) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| format!("auth server returned {status}"))
    }
}

impl GoTrueProvider {
    pub fn new(client: Client, backend_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", backend_url.trim_end_matches('/')),
            api_key: api_key.into(),
            session: Mutex::new(None),
            bus: AuthEventBus::default(),
        }
    }

    /// Session held right now, without refreshing.
    pub fn session(&self) -> Option<ProviderSession> {
        self.lock().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.access_token.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProviderSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, session: Option<ProviderSession>) -> Option<ProviderSession> {
        std::mem::replace(&mut *self.lock(), session)
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<ProviderSession, SessionError> {
        let url = format!("{}/token?grant_type={grant_type}", self.auth_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::ProviderUnavailable(e.into()))?;

        let status = resp.status();
        if status.is_success() {
            let token: TokenResponse = resp
                .json()
                .await
                .map_err(|e| SessionError::ProviderUnavailable(e.into()))?;
            return Ok(token.into_session(Utc::now()));
        }
        let error: ErrorBody = resp.json().await.unwrap_or_default();
        let reason = error.describe(status);
        if status.is_client_error() {
            Err(SessionError::ProviderRejected(reason))
        } else {
            Err(SessionError::ProviderUnavailable(anyhow::anyhow!("{grant_type} grant failed: {reason}")))
        }
    }

    /// Sign in with email and password and broadcast `SIGNED_IN`.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, SessionError> {
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        info!(user_id = %session.user.id, "federated sign-in");
        self.replace(Some(session.clone()));
        self.bus
            .emit(AuthChangeEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        Ok(session)
    }

    /// Exchange the refresh token for a new session and broadcast
    /// `TOKEN_REFRESHED`. A rejected refresh token ends the session.
    pub async fn refresh_session(&self) -> Result<Option<ProviderSession>, SessionError> {
        let Some(refresh_token) = self.lock().as_ref().and_then(|s| s.refresh_token.clone()) else {
            return Ok(None);
        };

        match self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                {
                    let mut current = self.lock();
                    let still_current = current
                        .as_ref()
                        .is_some_and(|s| s.refresh_token.as_deref() == Some(refresh_token.as_str()));
                    if !still_current {
                        debug!("session changed during refresh; discarding refreshed token");
                        return Ok(current.clone());
                    }
                    *current = Some(session.clone());
                }
                debug!(user_id = %session.user.id, "token refreshed");
                self.bus
                    .emit(AuthChangeEvent::new(AuthEventKind::TokenRefreshed, Some(session.clone())));
                Ok(Some(session))
            }
            Err(SessionError::ProviderRejected(reason)) => {
                warn!(reason = %reason, "refresh token rejected; signing out locally");
                if self.replace(None).is_some() {
                    self.bus.emit(AuthChangeEvent::signed_out());
                }
                Err(SessionError::ProviderRejected(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Time until the token should be refreshed. `None` with no refreshable
    /// session; zero when already due.
    pub fn refresh_due_in(&self, margin: chrono::Duration) -> Option<Duration> {
        let guard = self.lock();
        let session = guard.as_ref()?;
        session.refresh_token.as_ref()?;
        let expires_at = session.expires_at?;
        let due = expires_at.checked_sub_signed(margin).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some((due - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Keep the federated token fresh until the task is aborted.
    ///
    /// Re-checks at least every `idle` so sign-ins made mid-sleep are picked
    /// up, and backs off by `idle` after a failed refresh.
    pub async fn auto_refresh(self: Arc<Self>, margin: chrono::Duration, idle: Duration) {
        loop {
            let wait = self.refresh_due_in(margin).map_or(idle, |d| d.min(idle));
            tokio::time::sleep(wait).await;

            if !self.refresh_due_in(margin).is_some_and(|d| d.is_zero()) {
                continue;
            }
            match self.refresh_session().await {
                Ok(_) => {}
                Err(SessionError::ProviderRejected(_)) => {}
                Err(e) => {
                    warn!(error = %e, "token refresh failed; will retry");
                    tokio::time::sleep(idle).await;
                }
            }
        }
    }
}

impl IdentityProvider for GoTrueProvider {
    async fn current_session(&self) -> Result<Option<ProviderSession>, SessionError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };
        let expired = session.expires_at.is_some_and(|at| at <= Utc::now());
        if !expired {
            return Ok(Some(session));
        }
        match self.refresh_session().await {
            Err(SessionError::ProviderRejected(_)) => Ok(None),
            other => other,
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.bus.subscribe()
    }

    /// Clears the local session and broadcasts `SIGNED_OUT` before revoking
    /// the token remotely.
    async fn sign_out(&self) -> Result<(), SessionError> {
        let Some(session) = self.replace(None) else {
            return Ok(());
        };
        self.bus.emit(AuthChangeEvent::signed_out());

        let resp = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| SessionError::ProviderUnavailable(e.into()))?;

        let status = resp.status();
        // An already-invalid token has nothing left to revoke.
        if status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let reason = resp.json::<ErrorBody>().await.unwrap_or_default().describe(status);
        if status.is_client_error() {
            Err(SessionError::ProviderRejected(reason))
        } else {
            Err(SessionError::ProviderUnavailable(anyhow::anyhow!("logout failed: {reason}")))
        }
    }
}

impl PasswordSignIn for GoTrueProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderSession, SessionError> {
        GoTrueProvider::sign_in_with_password(self, email, password).await
    }
}
