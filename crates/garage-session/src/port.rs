//! Ports to the external collaborators of the session layer.
//!
//! Futures are required to be `Send` so the reconciler can run on a spawned
//! task; implementors may still write plain `async fn`.

use std::future::Future;

use garage_domain::id::FederatedUserId;
use garage_domain::profile::{Profile, ShadowRecord};

use crate::error::{ProfileLookupError, SessionError};
use crate::event::{AuthSubscription, ProviderSession};

/// Federated identity provider.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Session the provider currently holds, if any.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<ProviderSession>, SessionError>> + Send;

    /// Subscribe to sign-in, sign-out and token-refresh notifications.
    fn subscribe(&self) -> AuthSubscription;

    fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Canonical profile store: point lookup by primary key.
pub trait ProfileStore: Send + Sync + 'static {
    fn find_profile(
        &self,
        id: &FederatedUserId,
    ) -> impl Future<Output = Result<Profile, ProfileLookupError>> + Send;
}

/// Session-scoped storage of a locally-authenticated principal.
///
/// Writes are whole-record replacements.
pub trait ShadowStore: Send + Sync + 'static {
    fn save(&self, record: &ShadowRecord) -> Result<(), SessionError>;
    fn load(&self) -> Option<ShadowRecord>;
    fn clear(&self);
}
