use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::env;

/// Which object store the gateway writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Google Cloud Storage (`gs://`)
    Gcs,
    /// Amazon S3 or an S3-compatible endpoint (`s3://`)
    S3,
    /// Directory tree on local disk (`file://`)
    Local,
    /// Process memory, lost on exit (`memory://`)
    Memory,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: Option<String>,
    pub enforce_app_check: bool,
    pub default_app_id: Option<String>,
    pub backend: BackendKind,
    pub storage_dir: String,
    pub s3_endpoint: Option<String>,
    pub raw_prefix: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "JSON ingestion gateway for object storage")]
pub struct Args {
    /// Host to bind to (overrides INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Target bucket (overrides TARGET_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Require an App Check token on ingest calls (overrides ENFORCE_APP_CHECK)
    #[arg(long)]
    pub enforce_app_check: bool,

    /// Fallback application id (overrides DEFAULT_APP_ID)
    #[arg(long)]
    pub default_app_id: Option<String>,

    /// Storage backend (overrides INGEST_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Root directory of the `local` backend (overrides INGEST_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Custom S3-compatible endpoint (overrides INGEST_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Top-level prefix for raw uploads (overrides INGEST_RAW_PREFIX)
    #[arg(long)]
    pub raw_prefix: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::merge(args, |name| env::var(name).ok())
    }

    /// Merge parsed CLI args over values looked up by `lookup`.
    ///
    /// Empty environment values count as unset.
    pub fn merge(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if var("TARGET_BUCKET").is_none() && args.bucket.is_none() {
            tracing::warn!("TARGET_BUCKET is not set; ingest calls will fail until it is configured");
        }
        if lookup("ENFORCE_APP_CHECK").is_none() && !args.enforce_app_check {
            tracing::warn!("ENFORCE_APP_CHECK is not set; defaulting to false");
        }

        // --- Environment fallback ---
        let env_host = var("INGEST_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("INGEST_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing INGEST_PORT value `{}`", value))?,
            None => 8080,
        };
        let env_backend = match var("INGEST_BACKEND") {
            Some(value) => BackendKind::from_str(&value, true)
                .map_err(|err| anyhow::anyhow!(err))
                .with_context(|| format!("parsing INGEST_BACKEND value `{}`", value))?,
            None => BackendKind::Gcs,
        };
        let env_enforce = lookup("ENFORCE_APP_CHECK").as_deref() == Some("true");
        let env_storage = var("INGEST_STORAGE_DIR").unwrap_or_else(|| "./data/buckets".into());
        let env_raw_prefix = var("INGEST_RAW_PREFIX").unwrap_or_else(|| "raw".into());

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            bucket: args.bucket.or_else(|| var("TARGET_BUCKET")),
            enforce_app_check: args.enforce_app_check || env_enforce,
            default_app_id: args.default_app_id.or_else(|| var("DEFAULT_APP_ID")),
            backend: args.backend.unwrap_or(env_backend),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            s3_endpoint: args.s3_endpoint.or_else(|| var("INGEST_S3_ENDPOINT")),
            raw_prefix: args.raw_prefix.unwrap_or(env_raw_prefix),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
