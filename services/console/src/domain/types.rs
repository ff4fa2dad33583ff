use std::fmt;

use serde::{Deserialize, Serialize};

use garage_domain::principal::{Principal, PrincipalSource};
use garage_domain::profile::Profile;
use garage_domain::role::Role;
use garage_session::SessionState;

/// Email and password submitted to a login endpoint.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Lower-cased, trimmed email. `None` when either field is blank.
    pub fn normalized_email(&self) -> Option<String> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(email)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session snapshot rendered by the session endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub source: PrincipalSource,
    pub id: Option<String>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
    pub loading: bool,
    pub error: Option<String>,
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        let principal = state.principal();
        Self::from_principal(&principal, state.loading, state.error.clone())
    }
}

impl SessionView {
    fn from_principal(principal: &Principal, loading: bool, error: Option<String>) -> Self {
        Self {
            source: principal.source(),
            id: principal.id().map(str::to_owned),
            role: principal.role(),
            profile: principal.profile().cloned(),
            loading,
            error,
        }
    }
}
