//! The unified, role-bearing identity the console trusts.

use serde::{Deserialize, Serialize};

use crate::id::{FederatedUserId, ShadowAccountId};
use crate::profile::{Profile, ShadowRecord};
use crate::role::Role;

/// Which identity source a principal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalSource {
    Federated,
    Shadow,
    None,
}

/// Current principal.
///
/// A federated principal exists as soon as the provider reports a user; its
/// profile may still be unresolved (`None`) while the lookup is in flight or
/// after a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    None,
    Federated {
        user_id: FederatedUserId,
        profile: Option<Profile>,
    },
    Shadow {
        account_id: ShadowAccountId,
        profile: Profile,
    },
}

/// Reasons a principal fails a role check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("no active session")]
    Unauthenticated,
    #[error("profile not resolved yet")]
    ProfilePending,
    #[error("role {0} is not allowed")]
    Forbidden(Role),
}

impl Principal {
    pub fn shadow(record: &ShadowRecord) -> Self {
        Self::Shadow {
            account_id: record.id.clone(),
            profile: record.to_profile(),
        }
    }

    pub fn source(&self) -> PrincipalSource {
        match self {
            Self::None => PrincipalSource::None,
            Self::Federated { .. } => PrincipalSource::Federated,
            Self::Shadow { .. } => PrincipalSource::Shadow,
        }
    }

    /// Source-specific id of the principal, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Federated { user_id, .. } => Some(user_id.as_str()),
            Self::Shadow { account_id, .. } => Some(account_id.as_str()),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::None => None,
            Self::Federated { profile, .. } => profile.as_ref(),
            Self::Shadow { profile, .. } => Some(profile),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Route-guard check: succeed when the principal holds one of `allowed`.
    pub fn authorize(&self, allowed: &[Role]) -> Result<&Profile, AccessDenied> {
        let profile = match self {
            Self::None => return Err(AccessDenied::Unauthenticated),
            Self::Federated { profile: None, .. } => return Err(AccessDenied::ProfilePending),
            Self::Federated {
                profile: Some(p), ..
            }
            | Self::Shadow { profile: p, .. } => p,
        };
        if allowed.contains(&profile.role) {
            Ok(profile)
        } else {
            Err(AccessDenied::Forbidden(profile.role))
        }
    }
}
