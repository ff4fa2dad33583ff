use tracing::{debug, info, warn};

use garage_domain::id::FederatedUserId;
use garage_domain::profile::{FallbackDefaults, Profile, ProviderMetadata, fallback_profile};

use crate::error::ProfileLookupError;
use crate::port::ProfileStore;

/// Resolves the profile of a federated user.
///
/// Never fails outward: a missing or rejected row yields a fallback profile
/// built from provider metadata, and an unreachable store yields `None`.
pub struct ProfileResolver<S> {
    store: S,
    defaults: FallbackDefaults,
}

impl<S> ProfileResolver<S> {
    pub fn new(store: S, defaults: FallbackDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ProfileStore> ProfileResolver<S> {
    pub async fn resolve(
        &self,
        user_id: &FederatedUserId,
        metadata: &ProviderMetadata,
    ) -> Option<Profile> {
        let cause = match self.store.find_profile(user_id).await {
            Ok(profile) => {
                debug!(user_id = %user_id, role = %profile.role, "profile loaded");
                return Some(profile);
            }
            Err(ProfileLookupError::Transport(e)) => {
                warn!(user_id = %user_id, error = %e, "profile store unreachable; profile left unset");
                return None;
            }
            Err(e) => e,
        };

        if let Some(raw) = &metadata.unrecognized_role {
            warn!(user_id = %user_id, role = %raw, "ignoring unrecognized role in provider metadata");
        }
        let profile = fallback_profile(user_id, metadata, &self.defaults);
        if metadata.role.is_none() {
            warn!(
                user_id = %user_id,
                role = %profile.role,
                cause = %cause,
                "no profile row and no role in metadata; applying fallback role"
            );
        } else {
            info!(user_id = %user_id, cause = %cause, "no profile row; using provider metadata");
        }
        Some(profile)
    }
}
