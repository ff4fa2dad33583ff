//! Newtype wrappers for principal identifiers.
//!
//! Ids issued by the identity provider and ids of shadow accounts are both
//! opaque strings, but they come from different namespaces and must never be
//! compared with each other. Keeping them as distinct types enforces that.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a user of the federated identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FederatedUserId(pub String);

impl FederatedUserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FederatedUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FederatedUserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for FederatedUserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifies a locally-authenticated staff account (shadow session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShadowAccountId(pub String);

impl ShadowAccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShadowAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShadowAccountId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ShadowAccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
