use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use garage_domain::principal::AccessDenied;
use garage_domain::role::{Role, UnknownRole};
use garage_session::SessionError;

/// Console service error variants.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthenticated,
    #[error("profile not resolved yet")]
    ProfilePending,
    #[error("role {0} is not allowed here")]
    Forbidden(Role),
    #[error("a federated session is active")]
    FederatedSessionActive,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ConsoleError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::ProfilePending => "PROFILE_PENDING",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::FederatedSessionActive => "FEDERATED_SESSION_ACTIVE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::FederatedSessionActive => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProfilePending | Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ConsoleError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::FederatedSessionActive => Self::FederatedSessionActive,
            SessionError::ProviderRejected(_) => Self::InvalidCredentials,
            SessionError::ProviderUnavailable(source) => {
                tracing::warn!(error = %source, "identity provider unavailable");
                Self::Unavailable("identity provider unavailable".to_owned())
            }
            other => Self::Internal(other.into()),
        }
    }
}

impl From<AccessDenied> for ConsoleError {
    fn from(e: AccessDenied) -> Self {
        match e {
            AccessDenied::Unauthenticated => Self::Unauthenticated,
            AccessDenied::ProfilePending => Self::ProfilePending,
            AccessDenied::Forbidden(role) => Self::Forbidden(role),
        }
    }
}

impl From<UnknownRole> for ConsoleError {
    fn from(e: UnknownRole) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::Internal(e) => Some(format!("{e:#}")),
            _ => None,
        };
        garage_core::error::json_error(self.status(), self.kind(), self.to_string(), detail.as_deref())
    }
}
