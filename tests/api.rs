//! Router tests: the end-to-end account scenarios over HTTP, backed by the
//! in-memory store.

mod common;

use accounts::auth::TokenIssuer;
use accounts::create_app;
use accounts::repositories::AccountStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use common::{harness, Harness, JWT_SECRET, PASSWORD, TOKEN_LIFETIME_SECS};
use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn setup() -> (Harness, Router) {
    let h = harness();
    let app = create_app(h.state.clone());
    (h, app)
}

async fn register(app: &Router, email: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/user/register",
            json!({ "email": email, "password": PASSWORD }),
            None,
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await
}

async fn confirmed_session(h: &Harness, app: &Router, email: &str) -> String {
    register(app, email).await;
    let token = h.notifier.confirmation_token(email).unwrap();
    send(app, get(&format!("/api/user/confirm?token={}", token), None)).await;
    let (status, body) = login(app, email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let (_h, app) = setup();
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_twice_is_duplicate_email() {
    let (_h, app) = setup();
    let (status, body) = register(&app, "a@b.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "a@b.com");
    assert!(body["id"].is_string());
    assert!(body["createdAt"].is_string());
    assert!(body["message"].is_string());
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("confirmationToken").is_none());

    let (status, body) = register(&app, "a@b.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn register_rejects_invalid_payload() {
    let (_h, app) = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/user/register",
            json!({ "email": "a@b.com", "password": "alllowercase" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn login_before_confirmation_is_invalid_credentials() {
    let (_h, app) = setup();
    register(&app, "a@b.com").await;

    let (status, unconfirmed) = login(&app, "a@b.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unconfirmed["error"], "INVALID_CREDENTIALS");

    let (status, unknown) = login(&app, "ghost@b.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error"], unconfirmed["error"]);
    assert_eq!(unknown["message"], unconfirmed["message"]);
}

#[tokio::test]
async fn confirm_then_reconfirm_is_invalid_token() {
    let (h, app) = setup();
    register(&app, "a@b.com").await;
    let token = h.notifier.confirmation_token("a@b.com").unwrap();
    let uri = format!("/api/user/confirm?token={}", token);

    let (status, body) = send(&app, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    let account = h.store.find_by_email("a@b.com").await.unwrap().unwrap();
    assert!(account.confirmed);

    let (status, body) = send(&app, get(&uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn confirm_without_token_is_json_validation_error() {
    let (_h, app) = setup();
    let (status, body) = send(&app, get("/api/user/confirm", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_FAILED");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn login_after_confirmation_returns_bearer_token() {
    let (h, app) = setup();
    register(&app, "a@b.com").await;
    let token = h.notifier.confirmation_token("a@b.com").unwrap();
    send(&app, get(&format!("/api/user/confirm?token={}", token), None)).await;

    let (status, body) = login(&app, "a@b.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["expiresIn"], TOKEN_LIFETIME_SECS);
    assert_eq!(body["user"]["email"], "a@b.com");
    let session = body["token"].as_str().unwrap();
    assert_eq!(h.tokens.verify(session).unwrap(), "a@b.com");
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_generic() {
    let (h, app) = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            json!({ "email": "ghost@b.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert!(h.store.is_empty().await);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn expired_reset_then_invalid_token() {
    let (h, app) = setup();
    confirmed_session(&h, &app, "a@b.com").await;
    send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            json!({ "email": "a@b.com" }),
            None,
        ),
    )
    .await;
    let token = h.notifier.reset_token("a@b.com").unwrap();
    h.store
        .set_reset_token("a@b.com", &token, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    let reset = json!({ "token": token, "newPassword": "Fresh456@" });
    let (status, body) = send(
        &app,
        json_request("POST", "/api/auth/reset-password", reset.clone(), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "RESET_TOKEN_EXPIRED");

    let (status, body) = send(
        &app,
        json_request("POST", "/api/auth/reset-password", reset, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn reset_password_allows_login_with_new_password() {
    let (h, app) = setup();
    confirmed_session(&h, &app, "a@b.com").await;
    send(
        &app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            json!({ "email": "a@b.com" }),
            None,
        ),
    )
    .await;
    let token = h.notifier.reset_token("a@b.com").unwrap();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "Fresh456@" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login(&app, "a@b.com", "Fresh456@").await.0, StatusCode::OK);
    assert_eq!(
        login(&app, "a@b.com", PASSWORD).await.0,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let (_h, app) = setup();
    let (status, body) = send(&app, get("/api/user/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(&app, get("/api/user/profile", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/user/change-password",
            json!({ "currentPassword": PASSWORD, "newPassword": "Fresh456@" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_or_forged_bearer_token_is_unauthorized() {
    let (h, app) = setup();
    let session = confirmed_session(&h, &app, "a@b.com").await;

    let expired = TokenIssuer::new(JWT_SECRET, -120)
        .mint("a@b.com")
        .unwrap()
        .token;
    let (status, body) = send(&app, get("/api/user/profile", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let foreign = TokenIssuer::new("another-secret-also-32-chars-long", 3600)
        .mint("a@b.com")
        .unwrap()
        .token;
    let (body_part, _) = session.rsplit_once('.').unwrap();
    let (_, foreign_sig) = foreign.rsplit_once('.').unwrap();
    let forged = format!("{}.{}", body_part, foreign_sig);
    let (status, body) = send(&app, get("/api/user/profile", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(&app, get("/api/user/profile", Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_with_token_returns_view() {
    let (h, app) = setup();
    let session = confirmed_session(&h, &app, "a@b.com").await;

    let (status, body) = send(&app, get("/api/user/profile", Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["confirmed"], true);
    assert!(body["passwordChangedAt"].is_string());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn change_password_maps_failures_to_bad_request() {
    let (h, app) = setup();
    let session = confirmed_session(&h, &app, "a@b.com").await;
    let change = |current: &str, new: &str| {
        json_request(
            "PUT",
            "/api/user/change-password",
            json!({ "currentPassword": current, "newPassword": new }),
            Some(&session),
        )
    };

    let (status, body) = send(&app, change("Wrong123!", "Fresh456@")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CREDENTIALS");

    let (status, body) = send(&app, change(PASSWORD, PASSWORD)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PASSWORD_REUSE");

    let (status, _) = send(&app, change(PASSWORD, "Fresh456@")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login(&app, "a@b.com", "Fresh456@").await.0, StatusCode::OK);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn request_logs_omit_query_string() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (_h, app) = setup();
    let (status, _) = send(
        &app,
        get("/api/user/confirm?token=confirmation-secret-0123", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let output = logs.contents();
    assert!(output.contains("/api/user/confirm"), "{}", output);
    assert!(!output.contains("confirmation-secret-0123"), "{}", output);
}
