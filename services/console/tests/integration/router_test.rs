use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use garage_core::middleware::REQUEST_ID_HEADER;

use crate::helpers::{NEWCOMER_ID, OWNER_ID, TestClient, console, send, spawn_backend};

fn owner_login() -> serde_json::Value {
    json!({ "email": "owner@garage.test", "password": "secret" })
}

fn employee_login() -> serde_json::Value {
    json!({ "email": "ana@garage.test", "password": "1234" })
}

#[tokio::test]
async fn should_answer_health_and_readiness() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);

    let (status, _) = send(&router, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn should_attach_request_id() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);

    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();

    let id = resp.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn should_start_without_principal() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);

    let (status, body) = send(&router, "GET", "/session", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "none");
    assert_eq!(body["loading"], false);
    assert!(body["profile"].is_null());

    let (status, body) = send(&router, "GET", "/session/access?role=owner", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn should_sign_in_employee_as_shadow_session() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser.send("POST", "/session/employee", Some(employee_login())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(browser.cookie.is_some());
    assert_eq!(body["source"], "shadow");
    assert_eq!(body["id"], "e1");
    assert_eq!(body["role"], "manager");
    assert_eq!(body["profile"]["full_name"], "Ana");
    assert!(body["profile"]["email"].is_null());

    let (status, body) = browser.send("GET", "/session/access?role=owner,manager", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");

    let (status, body) = browser.send("GET", "/session/access?role=owner", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "FORBIDDEN");
}

#[tokio::test]
async fn should_not_share_session_with_client_without_cookie() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut staff = TestClient::new(&router);
    staff.send("POST", "/session/employee", Some(employee_login())).await;

    let (status, body) = send(&router, "GET", "/session/access?role=manager", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHENTICATED");

    let (status, _) = send(&router, "DELETE", "/session", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&router, "GET", "/session", None).await;
    assert_eq!(body["source"], "none");

    let (status, body) = staff.send("GET", "/session/access?role=manager", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ana");
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn should_reject_forged_session_cookie() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut staff = TestClient::new(&router);
    staff.send("POST", "/session/employee", Some(employee_login())).await;

    let mut forger = TestClient::new(&router);
    forger.cookie = Some("00000000-0000-4000-8000-000000000000".to_owned());

    let (status, _) = forger.send("GET", "/session/access?role=manager", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = forger.send("DELETE", "/session", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_keep_principals_of_two_browsers_apart() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut staff = TestClient::new(&router);
    let mut owner = TestClient::new(&router);

    staff.send("POST", "/session/employee", Some(employee_login())).await;
    let (status, _) = owner.send("POST", "/session/federated", Some(owner_login())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(staff.session_id(), owner.session_id());

    let (_, body) = staff.send("GET", "/session", None).await;
    assert_eq!(body["source"], "shadow");
    let (_, body) = owner.send("GET", "/session", None).await;
    assert_eq!(body["source"], "federated");

    let (status, _) = owner.send("DELETE", "/session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(owner.cookie.is_none());

    let (status, body) = staff.send("GET", "/session/access?role=manager", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "e1");
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn should_reject_bad_employee_password() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser
        .send(
            "POST",
            "/session/employee",
            Some(json!({ "email": "ana@garage.test", "password": "nope" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "INVALID_CREDENTIALS");
    assert!(browser.cookie.is_none());
    assert!(state.sessions.is_empty());
    let (_, body) = browser.send("GET", "/session", None).await;
    assert_eq!(body["source"], "none");
}

#[tokio::test]
async fn should_sign_in_federated_with_canonical_profile() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser.send("POST", "/session/federated", Some(owner_login())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "federated");
    assert_eq!(body["id"], OWNER_ID);
    assert_eq!(body["profile"]["full_name"], "Olga Owner");
    assert_eq!(body["role"], "owner");

    let (status, _) = browser.send("GET", "/session/access?role=owner", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn should_synthesize_fallback_profile_for_new_user() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[("GARAGE_FALLBACK_ROLE", "auditor")]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser
        .send(
            "POST",
            "/session/federated",
            Some(json!({ "email": "new@garage.test", "password": "secret" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], NEWCOMER_ID);
    assert_eq!(body["profile"]["full_name"], "Nora");
    assert_eq!(body["role"], "auditor");
}

#[tokio::test]
async fn should_report_pending_profile_when_store_down() {
    let backend = spawn_backend().await;
    backend.force_profile_status(StatusCode::SERVICE_UNAVAILABLE);
    let (router, _) = console(&backend, &[("LOGIN_WAIT_MS", "100")]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser.send("POST", "/session/federated", Some(owner_login())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "federated");
    assert!(body["profile"].is_null());

    let (status, body) = browser.send("GET", "/session/access?role=owner", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "PROFILE_PENDING");
}

#[tokio::test]
async fn should_reject_bad_federated_password() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);

    let (status, body) = browser
        .send(
            "POST",
            "/session/federated",
            Some(json!({ "email": "owner@garage.test", "password": "wrong" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "INVALID_CREDENTIALS");
    assert!(browser.cookie.is_none());
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn should_refuse_employee_login_during_federated_session() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/federated", Some(owner_login())).await;

    let (status, body) = browser.send("POST", "/session/employee", Some(employee_login())).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "FEDERATED_SESSION_ACTIVE");
    let (_, body) = browser.send("GET", "/session", None).await;
    assert_eq!(body["source"], "federated");
}

#[tokio::test]
async fn should_evict_shadow_session_on_federated_login() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/employee", Some(employee_login())).await;
    let first_id = browser.session_id().to_owned();

    let (status, body) = browser.send("POST", "/session/federated", Some(owner_login())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "federated");
    assert_eq!(browser.session_id(), first_id);
    assert!(browser.session(&state).session.snapshot().shadow.is_none());
}

#[tokio::test]
async fn should_sign_out_federated_session() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/federated", Some(owner_login())).await;
    let client = browser.session(&state);

    let (status, _) = browser.send("DELETE", "/session", None).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(browser.cookie.is_none());
    assert_eq!(backend.state.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(client.provider.session(), None);
    assert!(state.sessions.is_empty());
    let (_, body) = browser.send("GET", "/session", None).await;
    assert_eq!(body["source"], "none");
}

#[tokio::test]
async fn should_sign_out_even_when_provider_fails() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/federated", Some(owner_login())).await;
    backend.state.fail_logout.store(true, Ordering::SeqCst);

    let (status, _) = browser.send("DELETE", "/session", None).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = browser.send("GET", "/session", None).await;
    assert_eq!(body["source"], "none");
    assert!(body["profile"].is_null());
}

#[tokio::test]
async fn should_sign_out_shadow_session() {
    let backend = spawn_backend().await;
    let (router, state) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/employee", Some(employee_login())).await;
    let client = browser.session(&state);

    let (status, _) = browser.send("DELETE", "/session", None).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(backend.state.logouts.load(Ordering::SeqCst), 0);
    assert!(client.session.snapshot().shadow.is_none());
    let (_, body) = browser.send("GET", "/session", None).await;
    assert_eq!(body["source"], "none");
}

#[tokio::test]
async fn should_reject_unknown_role_in_access_check() {
    let backend = spawn_backend().await;
    let (router, _) = console(&backend, &[]);
    let mut browser = TestClient::new(&router);
    browser.send("POST", "/session/employee", Some(employee_login())).await;

    let (status, body) = browser.send("GET", "/session/access?role=mechanic", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BAD_REQUEST");
}
