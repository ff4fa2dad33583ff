//! Identity-provider session objects and the session-change event stream.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::warn;

use garage_domain::id::FederatedUserId;
use garage_domain::profile::ProviderMetadata;

/// Default buffer of undelivered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// User object issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: FederatedUserId,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl ProviderUser {
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::from_user_metadata(self.email.as_deref(), &self.user_metadata)
    }
}

/// Session issued by the identity provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: ProviderUser,
}

// Tokens stay out of logs.
impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Kind of session change reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One session-change notification. `session` is `None` after sign-out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChangeEvent {
    pub kind: AuthEventKind,
    pub session: Option<ProviderSession>,
}

impl AuthChangeEvent {
    pub fn new(kind: AuthEventKind, session: Option<ProviderSession>) -> Self {
        Self { kind, session }
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }
}

/// Fan-out channel a provider uses to publish session changes.
#[derive(Clone)]
pub struct AuthEventBus {
    tx: broadcast::Sender<AuthChangeEvent>,
}

impl AuthEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish an event; returns how many subscribers will receive it.
    pub fn emit(&self, event: AuthChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Handle on the provider's session-change stream. Dropping it releases the
/// subscription.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthChangeEvent>,
}

impl AuthSubscription {
    /// Next event, or `None` once the provider has gone away.
    ///
    /// A subscriber that falls behind skips to the oldest retained event: every
    /// event carries the full session, so only the latest one matters.
    pub async fn next(&mut self) -> Option<AuthChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
