//! Tests for bearer-token admission on `/mcp`.
//!
//! Every rejection must look the same to the caller, whether the provider
//! said the token is inactive or the provider could not be reached.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use indian_store_mcp::config::Config;
use indian_store_mcp::server::transport::{AppState, create_router};

fn ping_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, challenge, serde_json::from_slice(&bytes).unwrap())
}

fn app_for(server: &MockServer) -> axum::Router {
    let state = AppState::in_memory(Config::for_testing(&server.uri())).unwrap();
    create_router(Arc::clone(&state))
}

#[tokio::test]
async fn test_missing_token_rejected_without_introspection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_for(&server);

    let (status, challenge, body) = send(app.clone(), ping_request(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer"));
    assert_eq!(body["error"], "invalid_token");

    let (status, _, _) = send(app.clone(), ping_request(Some("Basic dXNlcjpwYXNz"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(app, ping_request(Some("Bearer "))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_active_token_admitted() {
    let server = MockServer::start().await;
    let credentials = STANDARD.encode("gateway-client:gateway-secret");

    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .and(header_matcher("authorization", format!("Basic {credentials}").as_str()))
        .and(body_string_contains("token=live-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "sub": "admin@indian-store.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _, body) = send(app_for(&server), ping_request(Some("Bearer live-token"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_inactive_and_failed_introspection_are_indistinguishable() {
    let inactive_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": false})))
        .mount(&inactive_server)
        .await;

    let failing_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(500).set_body_string("hydra exploded"))
        .mount(&failing_server)
        .await;

    let inactive = send(app_for(&inactive_server), ping_request(Some("Bearer t"))).await;
    let failed = send(app_for(&failing_server), ping_request(Some("Bearer t"))).await;

    assert_eq!(inactive.0, StatusCode::UNAUTHORIZED);
    assert_eq!(inactive, failed);
    assert_eq!(inactive.2["error_description"], "Token expired or invalid");
    assert!(!failed.2.to_string().contains("hydra exploded"));
}

#[tokio::test]
async fn test_garbage_introspection_response_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth2/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let (status, _, _) = send(app_for(&server), ping_request(Some("Bearer t"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unreachable_provider_rejected() {
    // Nothing listens on this port.
    let state = AppState::in_memory(Config::for_testing("http://127.0.0.1:9")).unwrap();
    let app = create_router(Arc::clone(&state));

    let (status, _, body) = send(app, ping_request(Some("Bearer t"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_description"], "Token expired or invalid");
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    for uri in ["/health", "/.well-known/oauth-authorization-server"] {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}
