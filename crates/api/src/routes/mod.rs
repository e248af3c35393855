pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /systems/{slug}/jobs    submit, list (POST, GET)
/// /jobs/{id}              poll one job (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Per-system submission and listing.
        .nest("/systems", jobs::system_router())
        // Cross-system polling by job id.
        .nest("/jobs", jobs::router())
}
