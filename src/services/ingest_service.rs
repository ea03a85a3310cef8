//! IngestService validates a callable request, resolves its storage key,
//! optionally probes write access and persists the payload.
//!
//! The service is immutable after construction and cheap to clone; each call
//! is independent and performs at most three sequential backend calls
//! (probe put, probe delete, payload put). Nothing is retried.

use crate::{
    errors::IngestError,
    models::{receipt::IngestReceipt, variant::IngestVariant},
    services::{
        clock::Clock,
        object_writer, path_resolver,
        path_resolver::ResolverDefaults,
        storage_backend::StorageBackend,
        validator, write_authorizer,
    },
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const MISSING_BUCKET_MESSAGE: &str = "TARGET_BUCKET environment variable is not set.";

#[derive(Clone)]
pub struct IngestService {
    /// `None` when no bucket is configured; calls then fail with `Internal`.
    backend: Option<Arc<dyn StorageBackend>>,
    clock: Arc<dyn Clock>,
    defaults: Arc<ResolverDefaults>,
}

impl IngestService {
    pub fn new(
        backend: Option<Arc<dyn StorageBackend>>,
        clock: Arc<dyn Clock>,
        defaults: ResolverDefaults,
    ) -> Self {
        Self {
            backend,
            clock,
            defaults: Arc::new(defaults),
        }
    }

    pub fn backend(&self) -> Option<&Arc<dyn StorageBackend>> {
        self.backend.as_ref()
    }

    /// Run one ingest call end to end.
    pub async fn ingest(
        &self,
        variant: IngestVariant,
        data: Value,
    ) -> Result<IngestReceipt, IngestError> {
        let request = validator::sanitize(variant, data)?;
        debug!(procedure = %variant, routing = ?request.routing, "Request validated");

        let backend = self
            .backend
            .as_deref()
            .ok_or_else(|| IngestError::internal(MISSING_BUCKET_MESSAGE))?;

        let stamp = self.clock.now();
        let path = path_resolver::resolve(&request.routing, &stamp, &self.defaults);
        path.ensure_storable().map_err(IngestError::InvalidArgument)?;
        info!(procedure = %variant, bucket = %backend.bucket(), key = %path, "Saving data");

        if variant.probes_write_access() {
            write_authorizer::verify_write_access(backend).await?;
        }

        let locator = object_writer::write_object(backend, &path, &request.payload).await?;
        Ok(IngestReceipt::stored_at(locator))
    }
}
