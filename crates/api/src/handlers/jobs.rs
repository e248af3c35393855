//! Handlers for job submission and polling.
//!
//! All endpoints require the owning system's API key. Submission returns
//! immediately with 202; the pipeline runs as a background task and clients
//! poll `GET /api/v1/jobs/{id}` for progress.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use genpipe_core::error::CoreError;
use genpipe_core::types::JobId;
use genpipe_db::models::job::JobListQuery;
use genpipe_db::repositories::JobRepo;
use genpipe_pipeline::runner;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{authorize_system, ApiKey};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/systems/{slug}/jobs
///
/// Submit a job to a registered system. The payload is validated by the
/// system's pipeline before any row is written; on success the job is
/// inserted in `received` status, the pipeline is spawned, and 202 is
/// returned without waiting for it.
pub async fn submit_job(
    key: ApiKey,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let system = authorize_system(&state.pool, &slug, &key).await?;

    let pipeline = state
        .registry
        .get(&system.slug)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "System",
            key: slug.clone(),
        }))?;

    pipeline.validate(&payload)?;

    // Validation guarantees a non-empty client_id in the payload.
    let client_id = payload
        .get("client_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let job_id = Uuid::new_v4();
    let job = JobRepo::create(&state.pool, job_id, &system.slug, &client_id, &payload).await?;

    tracing::info!(
        %job_id,
        system = %system.slug,
        client_id = %client_id,
        "Job submitted",
    );

    runner::spawn(Arc::clone(&state.pipeline_ctx), pipeline, job);

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            status: "processing_started",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
///
/// Poll a single job. Requires the key of the system the job belongs to.
/// Returns the full job row, including `result`/`error` at terminal states.
pub async fn get_job(
    key: ApiKey,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            key: job_id.to_string(),
        }))?;

    authorize_system(&state.pool, &job.system_slug, &key).await?;

    Ok(Json(job))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/systems/{slug}/jobs
///
/// List a system's jobs, newest first. Supports optional `status`, `limit`,
/// and `offset` query parameters.
pub async fn list_jobs(
    key: ApiKey,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let system = authorize_system(&state.pool, &slug, &key).await?;

    let jobs = JobRepo::list_by_system(&state.pool, &system.slug, &params).await?;

    Ok(Json(DataResponse { data: jobs }))
}
