//! Job entity model and listing DTO.

use genpipe_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::JobStatus;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: JobId,
    pub system_slug: String,
    pub client_id: String,
    /// Status label. Always one of the [`JobStatus`] labels when written by
    /// this service; stored as text so new stage labels need no migration.
    pub status: String,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Parsed status label, if recognized.
    pub fn job_status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }
}

/// Query parameters for `GET /api/v1/systems/{slug}/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Filter by status label (e.g. `failed`).
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, clamped to 1..=100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0; negative values read as 0.
    pub offset: Option<i64>,
}
