use crate::artifacts::ArtifactManager;
use crate::config::Config;
use crate::pipeline::ConversionService;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use soundforged_av::{Converter, StagingStore};
use soundforged_common::Bitrate;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod routes_debug;
pub mod routes_download;
pub mod routes_upload;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub service: Arc<ConversionService>,
    /// Bitrate used when an mp3 request carries no quality
    pub default_quality: Bitrate,
}

impl AppContext {
    /// Wire the storage, transcoder and artifact components from config.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = StagingStore::open(
            &config.storage.scratch_dir,
            config.storage.input_extension.clone(),
        )
        .with_context(|| {
            format!(
                "Failed to open scratch directory {:?}",
                config.storage.scratch_dir
            )
        })?;

        let probe = config.transcoder.probe();
        let converter = Converter::new(config.transcoder.converter_settings());
        let artifacts =
            ArtifactManager::new(store.clone(), probe.clone(), config.storage.artifact_ttl());
        let service = ConversionService::new(probe, store, converter, artifacts);

        let default_quality = Bitrate::new(config.transcoder.default_quality)
            .context("Invalid transcoder.default_quality")?;

        Ok(Self {
            config: Arc::new(config),
            service: Arc::new(service),
            default_quality,
        })
    }

    pub fn artifacts(&self) -> &ArtifactManager {
        self.service.artifacts()
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = ctx.config.server.max_upload_bytes();

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/upload_audio",
            post(routes_upload::upload_audio).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/download/:filename", get(routes_download::download))
        .route("/debug", get(routes_debug::debug_info))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // The recorder page and its assets
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            app = app.fallback_service(ServeDir::new(&dir).append_index_html_on_directories(true));
        }
    }

    app
}

async fn health_check() -> impl IntoResponse {
    "ok"
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let purge_on_startup = config.storage.purge_on_startup;
    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::from_config(config)?;
    let artifacts = ctx.artifacts().clone();

    if purge_on_startup {
        artifacts.purge_stale().await;
    }

    let transcoder = ctx.service.artifacts().status().await;
    if transcoder.transcoder_available {
        tracing::info!(
            version = transcoder.transcoder_version.as_deref().unwrap_or("unknown"),
            "Transcoder available"
        );
    } else {
        tracing::warn!("Transcoder not available; uploads will be rejected until it is installed");
    }

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let deleted = artifacts.shutdown().await;
    tracing::info!(deleted, "Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
