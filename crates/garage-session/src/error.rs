/// Session layer error variants.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("identity provider unavailable")]
    ProviderUnavailable(#[source] anyhow::Error),
    #[error("identity provider rejected the request: {0}")]
    ProviderRejected(String),
    #[error("a federated session is active")]
    FederatedSessionActive,
    #[error("failed to encode shadow session")]
    ShadowEncoding(#[from] serde_json::Error),
    #[error("session is no longer mounted")]
    Unmounted,
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::ProviderRejected(_) => "PROVIDER_REJECTED",
            Self::FederatedSessionActive => "FEDERATED_SESSION_ACTIVE",
            Self::ShadowEncoding(_) => "SHADOW_ENCODING",
            Self::Unmounted => "UNMOUNTED",
        }
    }
}

/// Outcome of a failed canonical profile lookup.
///
/// `NotFound` and `Rejected` mean the store answered without a usable row and
/// are resolved by fallback synthesis. `Transport` means the store could not
/// be reached; the profile is then left unset.
#[derive(Debug, thiserror::Error)]
pub enum ProfileLookupError {
    #[error("profile not found")]
    NotFound,
    #[error("profile lookup rejected: {0}")]
    Rejected(String),
    #[error("profile store unreachable")]
    Transport(#[source] anyhow::Error),
}
