use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use garage_domain::role::Role;
use garage_session::SessionState;

use crate::cookie::{clear_session_cookie, session_id, set_session_cookie};
use crate::domain::types::{Credentials, SessionView};
use crate::error::ConsoleError;
use crate::registry::ClientSession;
use crate::state::AppState;

/// The session named by the request cookie. Requests without one, or with an
/// id the registry no longer knows, are unauthenticated.
fn current_client(state: &AppState, jar: &CookieJar) -> Result<(String, Arc<ClientSession>), ConsoleError> {
    let id = session_id(jar).ok_or(ConsoleError::Unauthenticated)?;
    let client = state.sessions.get(id).ok_or(ConsoleError::Unauthenticated)?;
    Ok((id.to_owned(), client))
}

// ── GET /session ──────────────────────────────────────────────────────────────

pub async fn get_session(State(state): State<AppState>, jar: CookieJar) -> Json<SessionView> {
    let view = match current_client(&state, &jar) {
        Ok((_, client)) => SessionView::from(&client.session.snapshot()),
        Err(_) => SessionView::from(&SessionState::signed_out()),
    };
    Json(view)
}

// ── POST /session/federated ───────────────────────────────────────────────────

pub async fn create_federated_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ConsoleError> {
    let (id, client, created) = state.sessions.get_or_open(session_id(&jar));
    match state.federated_login(&client).execute(body).await {
        Ok(output) => {
            let jar = set_session_cookie(jar, id, state.cookie_secure);
            Ok((StatusCode::CREATED, jar, Json(SessionView::from(&output.state))))
        }
        Err(e) => {
            if created {
                state.sessions.remove(&id);
            }
            Err(e)
        }
    }
}

// ── POST /session/employee ────────────────────────────────────────────────────

pub async fn create_employee_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ConsoleError> {
    let (id, client, created) = state.sessions.get_or_open(session_id(&jar));
    match state.employee_login(&client).execute(body).await {
        Ok(output) => {
            let jar = set_session_cookie(jar, id, state.cookie_secure);
            Ok((StatusCode::CREATED, jar, Json(SessionView::from(&output.state))))
        }
        Err(e) => {
            if created {
                state.sessions.remove(&id);
            }
            Err(e)
        }
    }
}

// ── DELETE /session ───────────────────────────────────────────────────────────

/// Local state is reset even when the provider call fails, so a known
/// session always sees 204 and loses its cookie.
pub async fn delete_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ConsoleError> {
    let (id, client) = current_client(&state, &jar)?;
    // Failure is already logged by the session layer.
    let _ = client.session.sign_out().await;
    state.sessions.remove(&id);
    Ok((StatusCode::NO_CONTENT, clear_session_cookie(jar)))
}

// ── GET /session/access ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AccessQuery {
    /// Comma-separated list of allowed roles.
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub id: String,
    pub full_name: String,
    pub role: Role,
}

fn parse_roles(raw: &str) -> Result<Vec<Role>, ConsoleError> {
    let roles = raw
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::parse::<Role>)
        .collect::<Result<Vec<_>, _>>()?;
    if roles.is_empty() {
        return Err(ConsoleError::BadRequest("at least one role is required".to_owned()));
    }
    Ok(roles)
}

/// Route guard: 200 when the current principal holds one of the listed roles.
pub async fn check_access(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, ConsoleError> {
    let allowed = parse_roles(&query.role)?;
    let (_, client) = current_client(&state, &jar)?;
    let principal = client.session.principal();
    let profile = principal.authorize(&allowed)?;
    Ok(Json(AccessResponse {
        id: profile.id.clone(),
        full_name: profile.full_name.clone(),
        role: profile.role,
    }))
}
