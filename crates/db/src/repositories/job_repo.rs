//! Repository for the `jobs` table.
//!
//! Every status update carries a terminal-state guard so a `completed` or
//! `failed` row can never be written again. Callers get a `bool` back and
//! can tell a silently-skipped update from an applied one.

use genpipe_core::types::JobId;
use sqlx::PgPool;

use crate::models::job::{Job, JobListQuery};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, system_slug, client_id, status, payload, result, error, \
    created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Guard clause appended to every mutation: terminal rows are immutable.
const NOT_TERMINAL: &str = "status NOT IN ('completed', 'failed')";

/// Provides create/read/status-transition operations for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `received` status. Returns the inserted row.
    pub async fn create(
        pool: &PgPool,
        id: JobId,
        system_slug: &str,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, system_slug, client_id, status, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(system_slug)
            .bind(client_id)
            .bind(JobStatus::Received.as_str())
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Advance a job to a stage label, merging partial results into `result`.
    ///
    /// Returns `false` (and changes nothing) if the job is already terminal.
    pub async fn advance(
        pool: &PgPool,
        job_id: JobId,
        status: JobStatus,
        result_patch: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = $2, \
                 result = COALESCE(result, '{{}}'::jsonb) || $3::jsonb, \
                 updated_at = NOW() \
             WHERE id = $1 AND {NOT_TERMINAL}"
        );
        let res = sqlx::query(&query)
            .bind(job_id)
            .bind(status.as_str())
            .bind(result_patch)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Mark a job completed, merging the final result payload.
    ///
    /// A completed job always has a non-null `result` and a null `error`.
    /// Returns `false` if the job is already terminal.
    pub async fn complete(
        pool: &PgPool,
        job_id: JobId,
        result_patch: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = 'completed', \
                 result = COALESCE(result, '{{}}'::jsonb) || $2::jsonb, \
                 error = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND {NOT_TERMINAL}"
        );
        let res = sqlx::query(&query)
            .bind(job_id)
            .bind(result_patch)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Mark a job failed with an error message.
    ///
    /// Clears `result` so the terminal row carries exactly one of
    /// result/error. Intermediate assets already uploaded to object storage
    /// are intentionally left in place. Returns `false` if the job is
    /// already terminal.
    pub async fn fail(pool: &PgPool, job_id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = 'failed', \
                 error = $2, \
                 result = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND {NOT_TERMINAL}"
        );
        let res = sqlx::query(&query)
            .bind(job_id)
            .bind(error)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a system's jobs, newest first, with optional status filter.
    pub async fn list_by_system(
        pool: &PgPool,
        system_slug: &str,
        params: &JobListQuery,
    ) -> Result<Vec<Job>, sqlx::Error> {
        // Postgres rejects negative LIMIT/OFFSET, so clamp client input.
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut conditions = vec!["system_slug = $1".to_string()];
        let mut bind_idx: u32 = 2;

        if params.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE {} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            conditions.join(" AND "),
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Job>(&query).bind(system_slug);
        if let Some(status) = &params.status {
            q = q.bind(status);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
