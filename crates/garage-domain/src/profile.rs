//! Profile shapes: the canonical profile row, provider metadata, and the
//! locally-authenticated shadow record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{FederatedUserId, ShadowAccountId};
use crate::role::Role;

/// Display name used when neither the profile row nor provider metadata has one.
pub const DEFAULT_FULL_NAME: &str = "Usuario";

/// Denormalized view of the principal consumed by the rest of the console.
///
/// `id` is either a federated user id or a shadow account id; the two are not
/// comparable, see [`crate::principal::Principal`] for which one applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
}

impl Profile {
    /// Whether this profile was resolved for the given federated user.
    pub fn belongs_to(&self, user_id: &FederatedUserId) -> bool {
        self.id == user_id.as_str()
    }
}

/// Identity-provider metadata used to synthesize a fallback profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    /// Role string present in the metadata but not a known [`Role`].
    pub unrecognized_role: Option<String>,
}

impl ProviderMetadata {
    /// Extract metadata from a provider's free-form `user_metadata` object.
    ///
    /// `account_email` is the email registered on the provider account and is
    /// used when the metadata itself carries none.
    pub fn from_user_metadata(account_email: Option<&str>, metadata: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let (role, unrecognized_role) = match text("role") {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => (Some(role), None),
                Err(_) => (None, Some(raw)),
            },
            None => (None, None),
        };

        Self {
            email: text("email").or_else(|| account_email.map(str::to_owned)),
            full_name: text("full_name"),
            role,
            unrecognized_role,
        }
    }
}

/// Values used for fields the provider metadata does not supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDefaults {
    pub role: Role,
    pub full_name: String,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self {
            role: Role::Owner,
            full_name: DEFAULT_FULL_NAME.to_owned(),
        }
    }
}

/// Synthesize a profile for a federated user whose canonical row is missing.
pub fn fallback_profile(
    user_id: &FederatedUserId,
    metadata: &ProviderMetadata,
    defaults: &FallbackDefaults,
) -> Profile {
    Profile {
        id: user_id.as_str().to_owned(),
        email: metadata.email.clone(),
        full_name: metadata
            .full_name
            .clone()
            .unwrap_or_else(|| defaults.full_name.clone()),
        role: metadata.role.unwrap_or(defaults.role),
    }
}

/// A locally-authenticated staff account, persisted verbatim by the shadow
/// session store.
///
/// Email is intentionally absent: shadow principals always expose `email: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRecord {
    pub id: ShadowAccountId,
    pub full_name: String,
    pub role: Role,
}

impl ShadowRecord {
    pub fn to_profile(&self) -> Profile {
        Profile {
            id: self.id.as_str().to_owned(),
            email: None,
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }
}

impl From<&ShadowRecord> for Profile {
    fn from(record: &ShadowRecord) -> Self {
        record.to_profile()
    }
}
