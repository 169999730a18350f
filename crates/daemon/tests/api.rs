//! End-to-end tests of the HTTP API against an in-memory namespace store
//!
//! These drive the router directly, without binding a listener.

use std::time::Duration;

use axum::body::Body;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use zeroize::Zeroizing;

use common::crypto::{split, Secret};
use strongroom_daemon::http_server::router;
use strongroom_daemon::{ServiceConfig, ServiceState};

const PARTS: usize = 5;
const THRESHOLD: usize = 3;

async fn setup_state() -> ServiceState {
    let config = ServiceConfig {
        api_port: 0,
        sqlite_path: None,
        token_key: Zeroizing::new(vec![7u8; 32]),
        token_ttl: Duration::from_secs(60),
        log_level: tracing::Level::DEBUG,
        log_dir: None,
    };
    ServiceState::from_config(&config).await.unwrap()
}

fn shares() -> Vec<String> {
    let secret = Secret::generate().unwrap();
    split(secret.bytes(), PARTS, THRESHOLD)
        .unwrap()
        .iter()
        .map(|share| URL_SAFE_NO_PAD.encode(share))
        .collect()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Unseal a fresh vault with `THRESHOLD` of the given shares
async fn unseal(app: &Router, shares: &[String]) {
    for (idx, part) in shares.iter().take(THRESHOLD).enumerate() {
        let uri = format!("/api/v0/seal/unseal?part={}", part);
        let (status, body) = send(app, Method::POST, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["collected"], idx + 1);
    }
    let (status, body) = send(app, Method::POST, "/api/v0/seal/unseal/complete", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unsealed");
}

async fn signup(app: &Router, username: &str) -> String {
    let credentials = json!({"username": username, "password": "hunter2"});
    let (status, body) =
        send(app, Method::POST, "/api/v0/auth/signup", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_sealed_vault_rejects_requests() {
    let state = setup_state().await;
    let app = router(state.clone());

    let (status, _) = send(&app, Method::GET, "/_status/livez", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/_status/readyz", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, Method::GET, "/api/v0/seal/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "sealed");

    let token = state.tokens().issue("alice");
    let (status, body) = send(&app, Method::GET, "/api/v0/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "sealed");
}

#[tokio::test]
async fn test_unseal_flow() {
    let app = router(setup_state().await);
    let shares = shares();

    let uri = format!("/api/v0/seal/unseal?part={}", shares[0]);
    let (status, _) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    // the same share twice is a conflict
    let (status, body) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(&app, Method::GET, "/api/v0/seal/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unsealing");
    assert_eq!(body["collected"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v0/seal/unseal?part=***",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, "/api/v0/seal/unseal/reset", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discarded"], 1);

    unseal(&app, &shares).await;
    let (status, _) = send(&app, Method::GET, "/_status/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/api/v0/seal/seal", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/_status/readyz", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // a fresh quorum from the same split opens the existing root key
    let mut rest: Vec<String> = shares[2..].to_vec();
    rest.reverse();
    unseal(&app, &rest).await;
}

#[tokio::test]
async fn test_auth() {
    let app = router(setup_state().await);
    unseal(&app, &shares()).await;
    signup(&app, "alice").await;

    let credentials = json!({"username": "alice", "password": "hunter2"});
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v0/auth/signup",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v0/auth/signin",
        None,
        Some(credentials),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    for credentials in [
        json!({"username": "alice", "password": "wrong"}),
        json!({"username": "bob", "password": "hunter2"}),
    ] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v0/auth/signin",
            None,
            Some(credentials),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = send(&app, Method::GET, "/api/v0/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/api/v0/list", Some("not.a.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_secrets_crud() {
    let app = router(setup_state().await);
    unseal(&app, &shares()).await;
    let token = signup(&app, "alice").await;
    let token = Some(token.as_str());

    let record = json!({"key": "k", "value": "v"});
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v0/secrets?path=a//b",
        token,
        Some(record),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["path"], "a/b");

    let (status, body) = send(&app, Method::GET, "/api/v0/secrets/k?path=a/b", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "k", "value": "v", "is_base64": false}));

    let binary = json!({"value": "/wA=", "is_base64": true});
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/v0/secrets/k?path=a/b",
        token,
        Some(binary),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_base64"], true);
    assert_eq!(body["value"], "/wA=");

    let (status, body) = send(&app, Method::GET, "/api/v0/list?path=a", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"buckets": ["b"], "records": []}));

    let (status, body) = send(&app, Method::GET, "/api/v0/reclist", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "alice");
    assert_eq!(body["buckets"][0]["name"], "a");
    assert_eq!(body["buckets"][0]["buckets"][0]["records"][0]["key"], "k");

    let (status, body) =
        send(&app, Method::DELETE, "/api/v0/secrets/k?path=a/b", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_buckets"], 2);

    let (status, body) = send(&app, Method::GET, "/api/v0/secrets/k?path=a/b", token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(&app, Method::GET, "/api/v0/list", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"buckets": [], "records": []}));
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = router(setup_state().await);
    unseal(&app, &shares()).await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let record = json!({"key": "k", "value": "alice's"});
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v0/secrets",
        Some(&alice),
        Some(record),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::GET, "/api/v0/secrets/k", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, Method::GET, "/api/v0/secrets/k", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "alice's");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = router(setup_state().await);
    let request = Request::builder()
        .uri("/nope")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
