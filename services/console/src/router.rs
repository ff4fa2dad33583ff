use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use garage_core::health::healthz;
use garage_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    health::readyz,
    session::{check_access, create_employee_session, create_federated_session, delete_session, get_session},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Session
        .route("/session", get(get_session).delete(delete_session))
        .route("/session/federated", post(create_federated_session))
        .route("/session/employee", post(create_employee_session))
        .route("/session/access", get(check_access))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
