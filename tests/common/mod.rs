//! In-process backend for exercising the credential lifecycle end to end.
//!
//! The fake backend accepts exactly one bearer token at a time; the
//! refresh endpoint rotates it, counting how often it is hit, so tests can
//! assert on single-flight behavior and on which credential each request
//! actually carried.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

pub struct TestBackend {
    pub refresh_calls: AtomicUsize,
    pub refresh_ok: AtomicBool,
    pub refresh_delay: Duration,
    /// The token the protected endpoint currently accepts.
    pub accepted: Mutex<String>,
    /// The token the refresh endpoint hands out (and then accepts).
    pub next_token: Mutex<String>,
    /// Authorization header values seen by the protected endpoint, in order.
    pub seen_auth: Mutex<Vec<String>>,
}

pub struct TestServer {
    pub base_url: String,
    pub backend: Arc<TestBackend>,
}

/// Build an unsigned credential with the given expiry offset.
pub fn make_token(email: &str, ttl_secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let claims = json!({
        "sub": "u-1",
        "email": email,
        "exp": (Utc::now() + ChronoDuration::seconds(ttl_secs)).timestamp(),
        "aud": "authenticated",
        "role": "authenticated",
    });
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{header}.{payload}.sig")
}

pub async fn spawn_backend(accepted: &str, next_token: &str, refresh_delay: Duration) -> TestServer {
    let backend = Arc::new(TestBackend {
        refresh_calls: AtomicUsize::new(0),
        refresh_ok: AtomicBool::new(true),
        refresh_delay,
        accepted: Mutex::new(accepted.to_string()),
        next_token: Mutex::new(next_token.to_string()),
        seen_auth: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh", post(refresh_handler))
        .route("/api/chat/history", get(history_handler))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        backend,
    }
}

#[derive(serde::Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

/// Issues `next_token` for the password "secret"; 401 otherwise.
async fn login_handler(
    State(backend): State<Arc<TestBackend>>,
    Form(form): Form<LoginForm>,
) -> (StatusCode, Json<serde_json::Value>) {
    if form.password != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "data": null, "message": "invalid email or password"})),
        );
    }

    let token = backend.next_token.lock().unwrap().clone();
    *backend.accepted.lock().unwrap() = token.clone();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": {
                "access_token": token,
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": form.email},
            },
            "message": "ok",
        })),
    )
}

async fn refresh_handler(
    State(backend): State<Arc<TestBackend>>,
) -> (StatusCode, Json<serde_json::Value>) {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(backend.refresh_delay).await;

    if !backend.refresh_ok.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "data": null, "message": "refresh rejected"})),
        );
    }

    let next = backend.next_token.lock().unwrap().clone();
    *backend.accepted.lock().unwrap() = next.clone();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": {
                "access_token": next,
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": "user@example.com"},
            },
            "message": "ok",
        })),
    )
}

async fn history_handler(
    State(backend): State<Arc<TestBackend>>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    backend.seen_auth.lock().unwrap().push(auth.clone());

    let expected = format!("Bearer {}", backend.accepted.lock().unwrap());
    if auth != expected {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "data": null, "message": "invalid token"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": {"history": [{
                "id": "m-1",
                "user_id": "u-1",
                "message": "hi",
                "response": "hello there",
                "created_at": "2024-01-01T00:00:00Z",
            }]},
            "message": "ok",
        })),
    )
}
