//! Session reconciliation state machine.
//!
//! Decides which of {federated session, shadow session, none} is
//! authoritative, on mount and on every provider event, and publishes the
//! result as a [`SessionState`] over a `watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use garage_domain::id::FederatedUserId;
use garage_domain::profile::ShadowRecord;

use crate::cancel::CancelToken;
use crate::error::SessionError;
use crate::event::{AuthChangeEvent, AuthSubscription, ProviderSession, ProviderUser};
use crate::port::{IdentityProvider, ProfileStore, ShadowStore};
use crate::resolver::ProfileResolver;
use crate::settings::SessionSettings;
use crate::state::SessionState;

pub struct Reconciler<P, S, K> {
    provider: Arc<P>,
    resolver: ProfileResolver<S>,
    shadow: Arc<K>,
    state: watch::Sender<SessionState>,
    cancel: CancelToken,
    /// Bumped by every provider event and every sign-out. An initial
    /// resolution that observes a different value has been overtaken.
    generation: AtomicU64,
    profile_in_flight: Mutex<Option<FederatedUserId>>,
    connection_error: String,
}

impl<P, S, K> Reconciler<P, S, K> {
    pub fn new(provider: Arc<P>, profiles: S, shadow: Arc<K>, settings: SessionSettings) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            resolver: ProfileResolver::new(profiles, settings.fallback),
            shadow,
            state,
            cancel: CancelToken::new(),
            generation: AtomicU64::new(0),
            profile_in_flight: Mutex::new(None),
            connection_error: settings.connection_error,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Apply `f` unless torn down. `f` returns whether it changed anything.
    fn commit(&self, f: impl FnOnce(&mut SessionState) -> bool) -> bool {
        if self.cancel.is_cancelled() {
            debug!("session torn down; dropping state write");
            return false;
        }
        self.state.send_if_modified(f)
    }

    fn release_loading(&self) -> LoadingRelease<'_> {
        LoadingRelease {
            state: &self.state,
            cancel: &self.cancel,
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<FederatedUserId>> {
        self.profile_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P, S, K> Reconciler<P, S, K>
where
    P: IdentityProvider,
    S: ProfileStore,
    K: ShadowStore,
{
    /// Drive initial resolution and the event stream until cancelled or until
    /// the provider closes the stream.
    ///
    /// `subscription` must be taken before this is spawned so that no event
    /// published between mount and the first poll is lost.
    pub async fn run(self: Arc<Self>, mut subscription: AuthSubscription) {
        let work = async {
            tokio::join!(self.resolve_initial(), async {
                while let Some(event) = subscription.next().await {
                    self.apply_event(event).await;
                }
                debug!("auth event stream closed");
            });
        };
        tokio::select! {
            () = self.cancel.cancelled() => debug!("session reconciler torn down"),
            () = work => {}
        }
    }

    async fn resolve_initial(&self) {
        let _release = self.release_loading();
        let generation = self.generation.load(Ordering::SeqCst);

        let lookup = self.provider.current_session().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("session changed during initial resolution; keeping newer state");
            return;
        }

        let session = match lookup {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "initial session lookup failed");
                let message = self.connection_error.clone();
                self.commit(|s| {
                    s.error = Some(message);
                    true
                });
                return;
            }
        };

        match session {
            Some(session) => {
                let user = session.user.clone();
                info!(user_id = %user.id, "federated session restored");
                self.commit_federated(Some(session));
                self.refresh_profile(&user).await;
            }
            None => match self.shadow.load() {
                Some(record) => {
                    info!(account_id = %record.id, role = %record.role, "shadow session restored");
                    self.commit(|s| {
                        if s.user.is_some() {
                            return false;
                        }
                        s.profile = Some(record.to_profile());
                        s.shadow = Some(record);
                        true
                    });
                }
                None => debug!("no active session"),
            },
        }
    }

    async fn apply_event(&self, event: AuthChangeEvent) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _release = self.release_loading();

        let user = event.session.as_ref().map(|s| s.user.clone());
        debug!(
            kind = ?event.kind,
            user_id = user.as_ref().map(|u| u.id.as_str()),
            "auth state changed"
        );
        self.commit_federated(event.session);

        let Some(user) = user else { return };
        if self.cancel.is_cancelled() {
            return;
        }
        let resolved = self.with_state(|s| s.profile.as_ref().is_some_and(|p| p.belongs_to(&user.id)));
        if resolved {
            debug!(user_id = %user.id, "profile already resolved; skipping lookup");
        } else {
            self.refresh_profile(&user).await;
        }
    }

    /// Overwrite the federated fields. A present user evicts any shadow
    /// session, in memory and in the store.
    fn commit_federated(&self, session: Option<ProviderSession>) {
        let user = session.as_ref().map(|s| s.user.clone());
        let shadow = &self.shadow;
        self.commit(|s| {
            s.session = session;
            s.user = user;
            if s.user.is_some() {
                s.error = None;
                shadow.clear();
                if s.shadow.is_some() {
                    info!("federated session established; evicting shadow session");
                    if s.profile_is_shadow() {
                        s.profile = None;
                    }
                    s.shadow = None;
                }
            } else if s.shadow.is_none() {
                s.profile = None;
            }
            true
        });
    }

    async fn refresh_profile(&self, user: &ProviderUser) {
        {
            let mut in_flight = self.in_flight();
            if in_flight.as_ref() == Some(&user.id) {
                debug!(user_id = %user.id, "profile lookup already in flight");
                return;
            }
            *in_flight = Some(user.id.clone());
        }

        let resolved = self.resolver.resolve(&user.id, &user.metadata()).await;

        {
            let mut in_flight = self.in_flight();
            if in_flight.as_ref() == Some(&user.id) {
                *in_flight = None;
            }
        }

        let Some(profile) = resolved else { return };
        self.commit(|s| {
            let current = s.user.as_ref().is_some_and(|u| u.id == user.id);
            if current {
                s.profile = Some(profile);
            } else {
                debug!(user_id = %user.id, "discarding profile of superseded user");
            }
            current
        });
    }

    /// Install an already-authenticated shadow record as the principal.
    ///
    /// Refused while a federated user is established. Re-adopting the same
    /// record is a no-op for observers.
    pub fn adopt_shadow_session(&self, record: ShadowRecord) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Unmounted);
        }

        let mut outcome = Ok(());
        let shadow = &self.shadow;
        self.state.send_if_modified(|s| {
            if s.user.is_some() {
                outcome = Err(SessionError::FederatedSessionActive);
                return false;
            }
            if let Err(e) = shadow.save(&record) {
                outcome = Err(e);
                return false;
            }
            let profile = record.to_profile();
            let changed = s.loading
                || s.shadow.as_ref() != Some(&record)
                || s.profile.as_ref() != Some(&profile);
            s.profile = Some(profile);
            s.shadow = Some(record.clone());
            s.loading = false;
            changed
        });

        match &outcome {
            Ok(()) => info!(account_id = %record.id, role = %record.role, "shadow session adopted"),
            Err(e) => warn!(account_id = %record.id, error = %e, "shadow session refused"),
        }
        outcome
    }

    /// Sign out of both sources. Local state and the shadow store are reset
    /// even when the provider call fails; the provider error is still returned.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.commit(|s| !std::mem::replace(&mut s.loading, true));

        let reset = LocalReset {
            state: &self.state,
            cancel: &self.cancel,
            shadow: &*self.shadow,
        };
        let result = self.provider.sign_out().await;
        drop(reset);

        match &result {
            Ok(()) => info!("signed out"),
            Err(e) => warn!(error = %e, "federated sign-out failed; local session cleared anyway"),
        }
        result
    }
}

/// Clears `loading` when dropped, on every exit path.
struct LoadingRelease<'a> {
    state: &'a watch::Sender<SessionState>,
    cancel: &'a CancelToken,
}

impl Drop for LoadingRelease<'_> {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.state
                .send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        }
    }
}

/// Resets the local session when dropped, including when the sign-out future
/// itself is dropped mid-flight.
struct LocalReset<'a> {
    state: &'a watch::Sender<SessionState>,
    cancel: &'a CancelToken,
    shadow: &'a dyn ShadowStore,
}

impl Drop for LocalReset<'_> {
    fn drop(&mut self) {
        self.shadow.clear();
        if !self.cancel.is_cancelled() {
            self.state.send_replace(SessionState::signed_out());
        }
    }
}
