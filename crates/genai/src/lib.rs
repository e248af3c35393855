//! Thin HTTP clients for the hosted generation services the pipelines call:
//! Gemini (multimodal text generation), fal.ai (hosted media models via the
//! queue API), and the Supabase-compatible object store for final artifacts.
//!
//! Each client wraps a shared [`reqwest::Client`] and exposes a small typed
//! surface; none of them retry, a failed call fails the pipeline stage.

pub mod fal;
pub mod gemini;
pub mod storage;

pub use fal::FalClient;
pub use gemini::GeminiClient;
pub use storage::StorageClient;
