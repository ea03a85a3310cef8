//! App Check gate for ingest routes.
//!
//! Only the presence of the token header is checked here; verifying the
//! token itself is left to the platform in front of the gateway.

use crate::{errors::IngestError, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const APP_CHECK_HEADER: &str = "x-firebase-appcheck";

pub async fn require_app_check(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.enforce_app_check {
        let has_token = request
            .headers()
            .get(APP_CHECK_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !v.trim().is_empty());
        if !has_token {
            tracing::warn!(path = %request.uri().path(), "Rejected call without App Check token");
            return IngestError::Unauthenticated("Missing App Check token.".into()).into_response();
        }
    }
    next.run(request).await
}
