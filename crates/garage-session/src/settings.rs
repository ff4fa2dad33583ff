use garage_domain::profile::FallbackDefaults;

/// Message surfaced when the identity provider cannot be reached.
pub const DEFAULT_CONNECTION_ERROR: &str = "Error de conexión. Verifica tu red e intenta de nuevo.";

/// Tunables of the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Values used when a federated user's profile row is missing.
    pub fallback: FallbackDefaults,
    /// User-facing message for connectivity failures.
    pub connection_error: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fallback: FallbackDefaults::default(),
            connection_error: DEFAULT_CONNECTION_ERROR.to_owned(),
        }
    }
}
