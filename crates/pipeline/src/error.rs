use genpipe_core::assembly::AssemblyError;
use genpipe_genai::fal::FalError;
use genpipe_genai::gemini::GeminiError;
use genpipe_genai::storage::StorageError;

/// Error from a pipeline run.
///
/// Never surfaces over HTTP: the runner converts it to text on the failed
/// job row, where polling clients read it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid job payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    Fal(#[from] FalError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unusable model output: {0}")]
    Output(String),
}
