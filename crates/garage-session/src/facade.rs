//! Public session surface for the rest of the console.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use garage_domain::principal::Principal;
use garage_domain::profile::ShadowRecord;

use crate::error::SessionError;
use crate::port::{IdentityProvider, ProfileStore, ShadowStore};
use crate::reconciler::Reconciler;
use crate::settings::SessionSettings;
use crate::state::SessionState;

/// Owns a running [`Reconciler`] for its whole lifetime.
///
/// Dropping the facade (or calling [`unmount`](Self::unmount)) cancels the
/// reconciler and releases the provider subscription; writes that arrive
/// afterwards are discarded.
pub struct SessionFacade<P, S, K> {
    reconciler: Arc<Reconciler<P, S, K>>,
    task: Option<JoinHandle<()>>,
}

impl<P, S, K> SessionFacade<P, S, K>
where
    P: IdentityProvider,
    S: ProfileStore,
    K: ShadowStore,
{
    /// Start initial resolution and event reconciliation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(provider: Arc<P>, profiles: S, shadow: Arc<K>, settings: SessionSettings) -> Self {
        let subscription = provider.subscribe();
        let reconciler = Arc::new(Reconciler::new(provider, profiles, shadow, settings));
        let task = tokio::spawn(Arc::clone(&reconciler).run(subscription));
        debug!("session mounted");
        Self {
            reconciler,
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.reconciler.snapshot()
    }

    pub fn principal(&self) -> Principal {
        self.reconciler.with_state(SessionState::principal)
    }

    pub fn loading(&self) -> bool {
        self.reconciler.with_state(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.reconciler.with_state(|s| s.error.clone())
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.reconciler.watch()
    }

    /// Wait until `loading` is false and return that state.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.reconciler.watch();
        let ready = rx.wait_for(|s| !s.loading).await.map(|s| s.clone());
        ready.unwrap_or_else(|_| self.snapshot())
    }

    /// Install a shadow principal for a staff record whose credentials the
    /// caller has already verified. Does not contact the identity provider.
    ///
    /// Fails with [`SessionError::FederatedSessionActive`] while a federated
    /// principal is signed in; that session must be signed out first.
    pub fn adopt_shadow_session(&self, record: ShadowRecord) -> Result<(), SessionError> {
        self.reconciler.adopt_shadow_session(record)
    }

    /// Sign out of both sources. Afterwards the principal is `None` and the
    /// shadow store is empty, whether or not the provider call succeeded.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.reconciler.sign_out().await
    }

    /// Cancel the reconciler and wait for its task to finish.
    pub async fn unmount(mut self) {
        self.reconciler.cancel_token().cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "session reconciler ended abnormally");
            }
        }
        info!("session unmounted");
    }
}

impl<P, S, K> Drop for SessionFacade<P, S, K> {
    fn drop(&mut self) {
        self.reconciler.cancel_token().cancel();
    }
}
