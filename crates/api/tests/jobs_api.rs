//! Integration tests for job submission and polling.
//!
//! Submissions go to a system whose pipeline is stalled (see
//! `common::build_test_app`), so the job row stays exactly as the handler
//! wrote it.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_with_key, post_json, API_KEY, SYSTEM_SLUG};
use genpipe_db::models::job::JobListQuery;
use genpipe_db::repositories::JobRepo;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn submit_uri() -> String {
    format!("/api/v1/systems/{SYSTEM_SLUG}/jobs")
}

fn valid_payload() -> serde_json::Value {
    json!({
        "client_id": "c1",
        "audio_url": "https://x/a.mp3",
        "platforms": ["linkedin"],
    })
}

async fn job_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Submit: success path
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_returns_202_and_creates_received_job(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(app, &submit_uri(), Some(API_KEY), &valid_payload()).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = body_json(response).await;
    assert_eq!(body["status"], "processing_started");
    let job_id: Uuid = body["job_id"]
        .as_str()
        .expect("job_id must be a string")
        .parse()
        .expect("job_id must be a UUID");

    // Exactly one row, in received status, with no result or error yet.
    assert_eq!(job_count(&pool).await, 1);
    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status, "received");
    assert_eq!(job.system_slug, SYSTEM_SLUG);
    assert_eq!(job.client_id, "c1");
    assert_eq!(job.payload["audio_url"], "https://x/a.mp3");
    assert!(job.result.is_none());
    assert!(job.error.is_none());
}

// ---------------------------------------------------------------------------
// Submit: validation failures create no job
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_with_missing_field_returns_400_and_no_job(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool.clone());

    // audio_url is required for this system.
    let response = post_json(app, &submit_uri(), Some(API_KEY), &json!({ "client_id": "c1" })).await;

    common::assert_error_response(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert_eq!(job_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_with_empty_client_id_returns_400(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool.clone());

    let mut payload = valid_payload();
    payload["client_id"] = json!("");
    let response = post_json(app, &submit_uri(), Some(API_KEY), &payload).await;

    common::assert_error_response(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    assert_eq!(job_count(&pool).await, 0);
}

// ---------------------------------------------------------------------------
// Submit: authentication failures create no job
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_without_key_returns_401(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(app, &submit_uri(), None, &valid_payload()).await;

    common::assert_error_response(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(job_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_with_wrong_key_returns_401(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(app, &submit_uri(), Some("not-the-key"), &valid_payload()).await;

    common::assert_error_response(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(job_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_to_unknown_system_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/systems/no-such-system/jobs",
        Some(API_KEY),
        &valid_payload(),
    )
    .await;

    common::assert_error_response(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    assert_eq!(job_count(&pool).await, 0);
}

// ---------------------------------------------------------------------------
// Get: polling a job
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn get_job_returns_row_with_owning_key(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let job = JobRepo::create(&pool, Uuid::new_v4(), SYSTEM_SLUG, "c1", &valid_payload())
        .await
        .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = get_with_key(app, &format!("/api/v1/jobs/{}", job.id), API_KEY).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], job.id.to_string());
    assert_eq!(body["status"], "received");
    assert!(body["result"].is_null());
    assert!(body["error"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_job_with_another_systems_key_returns_401(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    common::seed_system(&pool, "generate-ai-video-ads", "other-key").await;
    let job = JobRepo::create(&pool, Uuid::new_v4(), SYSTEM_SLUG, "c1", &valid_payload())
        .await
        .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = get_with_key(app, &format!("/api/v1/jobs/{}", job.id), "other-key").await;

    common::assert_error_response(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_unknown_job_returns_404(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool);

    let response =
        get_with_key(app, &format!("/api/v1/jobs/{}", Uuid::new_v4()), API_KEY).await;

    common::assert_error_response(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_job_reports_terminal_failure(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let job = JobRepo::create(&pool, Uuid::new_v4(), SYSTEM_SLUG, "c1", &valid_payload())
        .await
        .unwrap();
    assert!(JobRepo::fail(&pool, job.id, "audio fetch failed").await.unwrap());

    let app = common::build_test_app(pool.clone());
    let response = get_with_key(app, &format!("/api/v1/jobs/{}", job.id), API_KEY).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "audio fetch failed");
    assert!(body["result"].is_null());
}

// ---------------------------------------------------------------------------
// List: per-system listing with filters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_jobs_returns_system_jobs_with_status_filter(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let first = JobRepo::create(&pool, Uuid::new_v4(), SYSTEM_SLUG, "c1", &valid_payload())
        .await
        .unwrap();
    JobRepo::create(&pool, Uuid::new_v4(), SYSTEM_SLUG, "c2", &valid_payload())
        .await
        .unwrap();
    assert!(JobRepo::fail(&pool, first.id, "boom").await.unwrap());

    let app = common::build_test_app(pool.clone());
    let response = get_with_key(app, &submit_uri(), API_KEY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let app = common::build_test_app(pool.clone());
    let response =
        get_with_key(app, &format!("{}?status=failed", submit_uri()), API_KEY).await;
    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], first.id.to_string());

    // The repo-level query honours the same filter.
    let failed = JobRepo::list_by_system(
        &pool,
        SYSTEM_SLUG,
        &JobListQuery {
            status: Some("failed".into()),
            limit: None,
            offset: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(failed.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_jobs_without_key_returns_401(pool: PgPool) {
    common::seed_system(&pool, SYSTEM_SLUG, API_KEY).await;
    let app = common::build_test_app(pool);

    let response = common::get(app, &submit_uri()).await;
    common::assert_error_response(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}
