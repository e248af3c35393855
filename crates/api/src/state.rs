use std::sync::Arc;

use genpipe_pipeline::{PipelineContext, PipelineRegistry};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: genpipe_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Slug → pipeline lookup for registered systems.
    pub registry: Arc<PipelineRegistry>,
    /// Clients and scratch-dir root handed to spawned pipeline runs.
    pub pipeline_ctx: Arc<PipelineContext>,
}
