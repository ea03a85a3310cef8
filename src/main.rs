use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use config::{AppConfig, BackendKind};
use services::{
    clock::SystemClock, cloud_backend::CloudBackend, ingest_service::IngestService,
    local_backend::LocalBackend, path_resolver::ResolverDefaults, storage_backend::StorageBackend,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- .env before anything reads the environment ---
    let dotenv = dotenvy::dotenv();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting ingest-gateway with config: {:?}", cfg);

    // --- Storage backend, built once and shared by every request ---
    let backend = build_backend(&cfg).await?;

    let ingest = IngestService::new(
        backend,
        Arc::new(SystemClock),
        ResolverDefaults {
            default_app_id: cfg.default_app_id.clone(),
            raw_prefix: cfg.raw_prefix.clone(),
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(state::AppState {
        ingest,
        enforce_app_check: cfg.enforce_app_check,
    });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the configured backend; `None` when no bucket is set.
async fn build_backend(cfg: &AppConfig) -> Result<Option<Arc<dyn StorageBackend>>> {
    let Some(bucket) = cfg.bucket.as_deref() else {
        return Ok(None);
    };

    let backend: Arc<dyn StorageBackend> = match cfg.backend {
        BackendKind::Gcs => Arc::new(
            CloudBackend::gcs(bucket).context("building Google Cloud Storage client")?,
        ),
        BackendKind::S3 => Arc::new(
            CloudBackend::s3(bucket, cfg.s3_endpoint.as_deref()).context("building S3 client")?,
        ),
        BackendKind::Local => Arc::new(
            LocalBackend::new(&cfg.storage_dir, bucket)
                .await
                .with_context(|| format!("preparing local bucket under {}", cfg.storage_dir))?,
        ),
        BackendKind::Memory => Arc::new(CloudBackend::in_memory(bucket)),
    };

    tracing::info!(
        "Writing to {}://{}",
        backend.scheme(),
        backend.bucket()
    );
    Ok(Some(backend))
}
