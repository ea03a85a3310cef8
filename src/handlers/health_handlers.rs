//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that probes write access to the target bucket

use crate::{services::write_authorizer::verify_write_access, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Runs the same write probe an ingest call would. HTTP 200 when the bucket
/// is configured and writable, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let storage_check = match state.ingest.backend() {
        None => CheckStatus {
            ok: false,
            error: Some("TARGET_BUCKET is not set".into()),
        },
        Some(backend) => match verify_write_access(&**backend).await {
            Ok(()) => CheckStatus {
                ok: true,
                error: None,
            },
            Err(err) => CheckStatus {
                ok: false,
                error: Some(err.to_string()),
            },
        },
    };

    let overall_ok = storage_check.ok;
    let mut checks = HashMap::new();
    checks.insert("storage", storage_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
