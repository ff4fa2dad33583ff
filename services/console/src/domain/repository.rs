#![allow(async_fn_in_trait)]

use garage_domain::id::FederatedUserId;
use garage_domain::profile::ShadowRecord;
use garage_session::port::{IdentityProvider, ProfileStore, ShadowStore};
use garage_session::{ProviderSession, SessionError, SessionFacade, SessionState};

use crate::error::ConsoleError;

/// Staff credential verification backed by the tenant database.
pub trait EmployeeDirectory: Send + Sync {
    /// Returns the staff record when the credentials match, `None` otherwise.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<ShadowRecord>, ConsoleError>;
}

/// Email/password sign-in against the identity provider.
pub trait PasswordSignIn: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, SessionError>;
}

/// The slice of the session facade the login use cases drive.
pub trait SessionPort: Send + Sync {
    fn adopt_shadow_session(&self, record: ShadowRecord) -> Result<(), SessionError>;

    /// Wait until `user_id` is the current federated user and their profile
    /// is resolved. Never completes if the profile store stays unreachable;
    /// callers bound it with a timeout.
    async fn profile_resolved_for(&self, user_id: &FederatedUserId) -> SessionState;

    fn snapshot(&self) -> SessionState;
}

impl<P, S, K> SessionPort for SessionFacade<P, S, K>
where
    P: IdentityProvider,
    S: ProfileStore,
    K: ShadowStore,
{
    fn adopt_shadow_session(&self, record: ShadowRecord) -> Result<(), SessionError> {
        SessionFacade::adopt_shadow_session(self, record)
    }

    async fn profile_resolved_for(&self, user_id: &FederatedUserId) -> SessionState {
        let mut rx = self.watch();
        let resolved = rx
            .wait_for(|s| {
                !s.loading
                    && s.user.as_ref().is_some_and(|u| &u.id == user_id)
                    && s.profile.as_ref().is_some_and(|p| p.belongs_to(user_id))
            })
            .await
            .map(|s| s.clone());
        resolved.unwrap_or_else(|_| SessionFacade::snapshot(self))
    }

    fn snapshot(&self) -> SessionState {
        SessionFacade::snapshot(self)
    }
}
