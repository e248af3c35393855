use std::path::PathBuf;

use genpipe_core::types::JobId;
use genpipe_db::DbPool;
use genpipe_genai::{FalClient, GeminiClient, StorageClient};

/// Shared dependencies handed to every pipeline run.
///
/// Cheaply cloneable pieces only; one instance is built at startup and
/// shared behind an `Arc` between the request handlers and the spawned runs.
pub struct PipelineContext {
    /// Database connection pool (job status updates).
    pub pool: DbPool,
    /// Gemini client (transcription-style analysis, script writing).
    pub gemini: GeminiClient,
    /// fal.ai client (image, TTS audio, and video models).
    pub fal: FalClient,
    /// Object storage for generated artifacts.
    pub storage: StorageClient,
    /// Root of per-job scratch directories.
    pub work_root: PathBuf,
}

impl PipelineContext {
    /// Scratch directory for one job. Created on demand by pipelines that
    /// need local files and removed when the run ends, whatever the outcome.
    pub fn job_dir(&self, job_id: JobId) -> PathBuf {
        self.work_root.join(job_id.to_string())
    }
}
