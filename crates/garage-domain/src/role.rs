//! Staff role domain type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role carried by a principal.
///
/// Wire format: lowercase string (`"superadmin"`, `"owner"`, ...), matching the
/// `role` column of the canonical profile store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Owner,
    Manager,
    Operator,
    Auditor,
}

/// Returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Superadmin,
        Role::Owner,
        Role::Manager,
        Role::Operator,
        Role::Auditor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Operator => "operator",
            Self::Auditor => "auditor",
        }
    }

    /// Whether an account with this role signs in through the federated identity
    /// provider. `operator` accounts only ever exist as shadow sessions.
    pub fn is_federated_eligible(self) -> bool {
        !matches!(self, Self::Operator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}
