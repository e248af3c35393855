use std::net::SocketAddr;
use std::sync::Arc;

use genpipe_genai::{storage, FalClient, GeminiClient, StorageClient};
use genpipe_pipeline::{PipelineContext, PipelineRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genpipe_api::config::ServerConfig;
use genpipe_api::router::build_app_router;
use genpipe_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genpipe_api=debug,genpipe_pipeline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = genpipe_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    genpipe_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    genpipe_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- External service clients ---
    let gemini_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let fal_key = std::env::var("FAL_API_KEY").expect("FAL_API_KEY must be set");
    let storage_url = std::env::var("STORAGE_URL").expect("STORAGE_URL must be set");
    let storage_key = std::env::var("STORAGE_SERVICE_KEY").expect("STORAGE_SERVICE_KEY must be set");
    let storage_bucket =
        std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| storage::DEFAULT_BUCKET.into());

    // --- Pipeline registry ---
    let registry = PipelineRegistry::builtin();
    tracing::info!(systems = ?registry.slugs(), "Pipeline registry loaded");

    let pipeline_ctx = Arc::new(PipelineContext {
        pool: pool.clone(),
        gemini: GeminiClient::new(gemini_key),
        fal: FalClient::new(fal_key),
        storage: StorageClient::new(storage_url, storage_key, storage_bucket),
        work_root: config.work_dir.clone(),
    });

    tokio::fs::create_dir_all(&pipeline_ctx.work_root)
        .await
        .expect("Failed to create work directory");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry: Arc::new(registry),
        pipeline_ctx,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // In-flight pipeline runs die with the process; their jobs stay at the
    // last recorded stage and read as stalled to polling clients.
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
