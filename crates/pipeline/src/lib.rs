//! Pipeline execution for registered systems.
//!
//! A [`SystemPipeline`] is the per-system unit of work: payload validation
//! (run synchronously before a job row exists) plus an ordered sequence of
//! external-API stages (run in the background after submission). The
//! [`runner`] owns terminal-state bookkeeping; pipelines themselves only
//! record forward progress.

pub mod context;
pub mod error;
pub mod podcast;
pub mod registry;
pub mod runner;
pub mod video_ads;

use async_trait::async_trait;
use genpipe_core::error::CoreError;
use genpipe_db::models::job::Job;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use registry::PipelineRegistry;

/// One registered system's processing logic.
#[async_trait]
pub trait SystemPipeline: Send + Sync {
    /// The system slug this pipeline serves.
    fn slug(&self) -> &'static str;

    /// Validate a submission payload. Called before any job row is created;
    /// a `Validation` error here is a synchronous 4xx for the caller.
    fn validate(&self, payload: &serde_json::Value) -> Result<(), CoreError>;

    /// Execute the stage sequence for one job.
    ///
    /// Stages run strictly in order; the first error aborts the run and the
    /// runner marks the job failed with the error text. On success the
    /// pipeline must have marked the job completed itself.
    async fn run(&self, ctx: &PipelineContext, job: &Job) -> Result<(), PipelineError>;
}
