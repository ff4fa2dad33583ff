use garage_domain::principal::Principal;
use garage_domain::profile::{Profile, ShadowRecord};

use crate::event::{ProviderSession, ProviderUser};

/// Observable session state.
///
/// `session`, `user`, `profile` and `shadow` are kept as separate fields for
/// consumers; [`principal`](Self::principal) folds them into one identity.
/// `profile` holds the federated user's profile, or the mapped shadow record
/// while a shadow session is active.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub session: Option<ProviderSession>,
    pub user: Option<ProviderUser>,
    pub profile: Option<Profile>,
    pub shadow: Option<ShadowRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session: None,
            user: None,
            profile: None,
            shadow: None,
            loading: true,
            error: None,
        }
    }
}

impl SessionState {
    /// State after an explicit sign-out.
    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::default()
        }
    }

    /// Federated session wins over shadow; a profile is only attached to a
    /// federated principal when it was resolved for that same user.
    pub fn principal(&self) -> Principal {
        if let Some(user) = &self.user {
            return Principal::Federated {
                user_id: user.id.clone(),
                profile: self
                    .profile
                    .as_ref()
                    .filter(|p| p.belongs_to(&user.id))
                    .cloned(),
            };
        }
        match &self.shadow {
            Some(record) => Principal::shadow(record),
            None => Principal::None,
        }
    }

    /// Whether `profile` is the mapped shadow record (as opposed to a federated
    /// profile).
    pub(crate) fn profile_is_shadow(&self) -> bool {
        match (&self.shadow, &self.profile) {
            (Some(record), Some(profile)) => record.to_profile() == *profile,
            _ => false,
        }
    }
}
