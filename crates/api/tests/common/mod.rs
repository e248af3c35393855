//! Shared helpers for API integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use genpipe_core::error::CoreError;
use genpipe_db::models::job::Job;
use genpipe_genai::{FalClient, GeminiClient, StorageClient};
use genpipe_pipeline::{podcast, PipelineContext, PipelineError, PipelineRegistry, SystemPipeline};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use genpipe_api::config::ServerConfig;
use genpipe_api::router::build_app_router;
use genpipe_api::state::AppState;

/// Slug of the system used by the tests (shadowed by [`StalledPipeline`]).
pub const SYSTEM_SLUG: &str = podcast::SLUG;

/// API key seeded for [`SYSTEM_SLUG`].
pub const API_KEY: &str = "test-key-1";

/// Pipeline that validates like the real podcast pipeline but never
/// finishes its run, so submitted jobs stay in `received` and tests can
/// assert on the row the handler wrote.
struct StalledPipeline;

#[async_trait]
impl SystemPipeline for StalledPipeline {
    fn slug(&self) -> &'static str {
        podcast::SLUG
    }

    fn validate(&self, payload: &serde_json::Value) -> Result<(), CoreError> {
        podcast::parse_request(payload).map(|_| ())
    }

    async fn run(&self, _ctx: &PipelineContext, _job: &Job) -> Result<(), PipelineError> {
        std::future::pending().await
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        work_dir: std::env::temp_dir().join("genpipe-test"),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses. External
/// service clients point at unroutable hosts; the stalled pipeline never
/// touches them.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();

    let mut registry = PipelineRegistry::builtin();
    registry.register(Arc::new(StalledPipeline));

    let pipeline_ctx = Arc::new(PipelineContext {
        pool: pool.clone(),
        gemini: GeminiClient::new("test-gemini-key".into()),
        fal: FalClient::new("test-fal-key".into()),
        storage: StorageClient::new(
            "http://storage.invalid".into(),
            "test-storage-key".into(),
            "system-assets".into(),
        ),
        work_root: config.work_dir.clone(),
    });

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry: Arc::new(registry),
        pipeline_ctx,
    };

    build_app_router(state, &config)
}

/// Insert a system registration row.
pub async fn seed_system(pool: &PgPool, slug: &str, api_key: &str) {
    sqlx::query("INSERT INTO systems (slug, name, api_key) VALUES ($1, $2, $3)")
        .bind(slug)
        .bind(slug)
        .bind(api_key)
        .execute(pool)
        .await
        .expect("Failed to seed system");
}

/// Send a GET request without credentials.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a GET request with an `X-API-Key` header.
pub async fn get_with_key(app: Router, uri: &str, api_key: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("x-api-key", api_key)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body and an optional `X-API-Key` header.
pub async fn post_json(
    app: Router,
    uri: &str,
    api_key: Option<&str>,
    body: &serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}

/// Assert an error response shape: the given status plus `{error, code}`.
pub async fn assert_error_response(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}
