use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Build the JSON error body shared by every console endpoint:
/// `{"kind": "...", "message": "..."}`.
///
/// 5xx responses are logged at `error` with `detail` (the full cause chain);
/// 4xx are expected client errors and are left to the HTTP trace layer.
pub fn json_error(status: StatusCode, kind: &'static str, message: String, detail: Option<&str>) -> Response {
    if status.is_server_error() {
        tracing::error!(kind, error = detail.unwrap_or(message.as_str()), "internal error");
    }
    let body = serde_json::json!({
        "kind": kind,
        "message": message,
    });
    (status, axum::Json(body)).into_response()
}
