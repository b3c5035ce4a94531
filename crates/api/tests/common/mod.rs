//! Shared harness for HTTP-level integration tests.
//!
//! Builds the full application router (same middleware stack as
//! production) over a test database, with a scriptable provider and a
//! directly drivable generation runner.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use weave_api::config::ServerConfig;
use weave_api::engine::GenerationRunner;
use weave_api::router::build_app_router;
use weave_api::state::AppState;
use weave_events::EventBus;
use weave_provider::ScriptedProvider;

/// Default test principal.
pub const USER: i64 = 1;

/// A second principal for ownership tests.
pub const OTHER_USER: i64 = 2;

/// Everything a test needs: the router plus handles on the seams.
pub struct TestApp {
    pub router: Router,
    pub provider: Arc<ScriptedProvider>,
    pub runner: GenerationRunner,
    pub bus: Arc<EventBus>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        provider_base_url: "http://provider.invalid".to_string(),
        provider_api_key: None,
    }
}

/// Build the full application over `pool` with a scripted provider.
pub fn build_test_app(pool: SqlitePool) -> TestApp {
    let config = test_config();
    let bus = Arc::new(EventBus::default());
    let provider = Arc::new(ScriptedProvider::new());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        provider: provider.clone(),
        event_bus: Arc::clone(&bus),
    };
    let router = build_app_router(state, &config);
    let runner = GenerationRunner::new(pool, provider.clone(), Arc::clone(&bus));

    TestApp {
        router,
        provider,
        runner,
        bus,
    }
}

/// Send one request through the router as `user` with the given role.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user: i64,
    role: &str,
    body: Option<serde_json::Value>,
) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-principal-id", user.to_string())
        .header("x-principal-role", role);

    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    router.clone().oneshot(request).await.unwrap()
}

pub async fn get(router: &Router, uri: &str, user: i64) -> Response {
    send(router, "GET", uri, user, "standard", None).await
}

pub async fn post_json(router: &Router, uri: &str, user: i64, body: serde_json::Value) -> Response {
    send(router, "POST", uri, user, "standard", Some(body)).await
}

pub async fn put_json(router: &Router, uri: &str, user: i64, body: serde_json::Value) -> Response {
    send(router, "PUT", uri, user, "standard", Some(body)).await
}

pub async fn delete(router: &Router, uri: &str, user: i64) -> Response {
    send(router, "DELETE", uri, user, "standard", None).await
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("body is not JSON: {e}"))
}

/// Create a project as `user`, returning its JSON representation.
pub async fn create_project(router: &Router, user: i64, name: &str) -> serde_json::Value {
    let response = post_json(
        router,
        "/api/v1/projects",
        user,
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Create a snippet in `project_id` as `user`.
pub async fn create_snippet(
    router: &Router,
    user: i64,
    project_id: i64,
    text: &str,
) -> serde_json::Value {
    let response = post_json(
        router,
        &format!("/api/v1/projects/{project_id}/snippets"),
        user,
        serde_json::json!({
            "text_primary": text,
            "position": { "x": 0.0, "y": 0.0 },
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
