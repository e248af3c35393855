//! Route definitions for job submission and polling.
//!
//! All endpoints require the owning system's API key.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/systems`.
///
/// ```text
/// GET    /{slug}/jobs     -> list_jobs
/// POST   /{slug}/jobs     -> submit_job
/// ```
pub fn system_router() -> Router<AppState> {
    Router::new().route("/{slug}/jobs", get(jobs::list_jobs).post(jobs::submit_job))
}

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{id}            -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(jobs::get_job))
}
