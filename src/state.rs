use crate::services::ingest_service::IngestService;

/// Shared router state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    /// Require an App Check token header on ingest routes.
    pub enforce_app_check: bool,
}
