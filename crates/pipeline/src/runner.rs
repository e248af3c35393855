//! Background execution of pipeline runs.
//!
//! The request handler inserts the job row and hands off here; the spawned
//! task owns the job until it reaches a terminal state. There is exactly one
//! runner per job, no cancellation, and no retry.

use std::sync::Arc;

use genpipe_core::types::JobId;
use genpipe_db::models::job::Job;
use genpipe_db::repositories::JobRepo;
use genpipe_db::DbPool;
use tokio::task::JoinHandle;

use crate::{PipelineContext, SystemPipeline};

/// Spawn a pipeline run for a freshly created job.
///
/// Any failure of the run, an `Err` or a panic inside a stage, marks the
/// job `failed` with the error text so it never strands in a non-terminal
/// state. A run whose job was already driven to a terminal state (which a
/// single owner should never produce) is logged and otherwise ignored.
pub fn spawn(
    ctx: Arc<PipelineContext>,
    pipeline: Arc<dyn SystemPipeline>,
    job: Job,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let job_id = job.id;
        let system = pipeline.slug();
        tracing::info!(%job_id, system, "Pipeline run started");

        // The run gets its own task so a panic surfaces as a JoinError here
        // instead of killing the terminal-state bookkeeping with it.
        let run = {
            let ctx = Arc::clone(&ctx);
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run(&ctx, &job).await })
        };

        match run.await {
            Ok(Ok(())) => {
                tracing::info!(%job_id, system, "Pipeline run finished");
            }
            Ok(Err(e)) => {
                tracing::error!(%job_id, system, error = %e, "Pipeline run failed");
                record_failure(&ctx.pool, job_id, &e.to_string()).await;
            }
            Err(join_err) => {
                tracing::error!(%job_id, system, error = %join_err, "Pipeline run panicked");
                record_failure(&ctx.pool, job_id, "pipeline task panicked").await;
            }
        }
    })
}

/// Mark a job failed, logging instead of propagating bookkeeping problems.
async fn record_failure(pool: &DbPool, job_id: JobId, error: &str) {
    match JobRepo::fail(pool, job_id, error).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(%job_id, "Job already terminal; failure not recorded");
        }
        Err(db_err) => {
            tracing::error!(%job_id, error = %db_err, "Could not record job failure");
        }
    }
}
