use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// Ready as soon as the router is serving; reports how many browser sessions
/// are open and how many are still resolving their principal.
pub async fn readyz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.len(),
        "resolving": state.sessions.resolving(),
    }))
}
