//! Defines routes for the callable ingest procedures.
//!
//! ## Structure
//! - **Health endpoints**
//!   - `GET  /healthz`: liveness
//!   - `GET  /readyz`: write probe against the target bucket
//!
//! - **Callable procedures** (behind the App Check gate)
//!   - `POST /saveAttributionData`: `{folderPrefix}/{date}/{fileName}_{millis}.json`
//!   - `POST /saveEventData`: `{folderPrefix}/{date}/{appId}/{USER}-{timestamp}.json`
//!   - `POST /saveRawData`: `{rawPrefix}/{date}/{uuid}.json`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        ingest_handlers::{save_attribution_data, save_event_data, save_raw_data},
    },
    models::variant::IngestVariant,
    routes::app_check::require_app_check,
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Route path of a callable procedure, e.g. `/saveEventData`.
pub fn procedure_path(variant: IngestVariant) -> String {
    format!("/{}", variant.procedure())
}

/// Build the full router with `state` applied.
pub fn routes(state: AppState) -> Router {
    let procedures = Router::new()
        .route(&procedure_path(IngestVariant::Attribution), post(save_attribution_data))
        .route(&procedure_path(IngestVariant::Event), post(save_event_data))
        .route(&procedure_path(IngestVariant::Raw), post(save_raw_data))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_app_check,
        ));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(procedures)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routes::app_check::APP_CHECK_HEADER,
        services::{
            clock::{FixedClock, Stamp},
            cloud_backend::CloudBackend,
            ingest_service::IngestService,
            path_resolver::ResolverDefaults,
            storage_backend::{BackendError, StorageBackend},
            test_support::ScriptedBackend,
        },
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state(backend: Option<Arc<dyn StorageBackend>>, enforce_app_check: bool) -> AppState {
        let stamp = Stamp {
            local: NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(10, 5, 7)
                .unwrap(),
            epoch_millis: 1000,
            nonce: Uuid::nil(),
        };
        AppState {
            ingest: IngestService::new(backend, Arc::new(FixedClock(stamp)), ResolverDefaults::default()),
            enforce_app_check,
        }
    }

    fn memory_router() -> Router {
        routes(state(Some(Arc::new(CloudBackend::in_memory("drop"))), false))
    }

    fn call(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let response = memory_router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_reports_writable_bucket() {
        let response = memory_router()
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["checks"]["storage"]["ok"], true);
    }

    #[tokio::test]
    async fn readyz_fails_without_bucket() {
        let response = routes(state(None, false))
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn attribution_call_returns_result_envelope() {
        let response = memory_router()
            .oneshot(call(
                "/saveAttributionData",
                json!({"data": {
                    "_firebaseFunction_fileName": "order",
                    "_firebaseFunction_folderPrefix": "orders",
                    "amount": 5
                }}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"result": {
                "success": true,
                "filePath": "memory://drop/orders/20240302/order_1000.json"
            }})
        );
    }

    #[tokio::test]
    async fn event_call_resolves_app_partition() {
        let response = memory_router()
            .oneshot(call(
                "/saveEventData",
                json!({"data": {"userPseudoID": "ab-12-CD", "folderPrefix": "events", "n": 1}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["result"]["filePath"],
            "memory://drop/events/20240302/unknown_app/AB12CD-20240302T100507.json"
        );
    }

    #[tokio::test]
    async fn every_procedure_is_routed_by_name() {
        assert_eq!(procedure_path(IngestVariant::Raw), "/saveRawData");
        for variant in [IngestVariant::Attribution, IngestVariant::Event, IngestVariant::Raw] {
            let response = memory_router()
                .oneshot(call(&procedure_path(variant), json!({"data": {}})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{variant}");
        }
    }

    #[tokio::test]
    async fn invalid_payload_is_400() {
        let response = memory_router()
            .oneshot(call("/saveRawData", json!({"data": {}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
        assert_eq!(body["error"]["message"], "Payload must be a non-empty JSON object.");
    }

    #[tokio::test]
    async fn missing_data_field_is_400() {
        let response = memory_router()
            .oneshot(call("/saveRawData", json!({"k": "v"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn denied_probe_is_403() {
        let backend: Arc<dyn StorageBackend> =
            Arc::new(ScriptedBackend::new().fail_put(BackendError::with_status(403, "forbidden")));
        let response = routes(state(Some(backend), false))
            .oneshot(call("/saveRawData", json!({"data": {"k": "v"}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"]["status"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn unconfigured_bucket_is_500() {
        let response = routes(state(None, false))
            .oneshot(call("/saveRawData", json!({"data": {"k": "v"}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "TARGET_BUCKET environment variable is not set."
        );
    }

    #[tokio::test]
    async fn app_check_gate_rejects_missing_token() {
        let router = routes(state(Some(Arc::new(CloudBackend::in_memory("drop"))), true));
        let response = router
            .oneshot(call("/saveRawData", json!({"data": {"k": "v"}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["status"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn app_check_gate_passes_with_token() {
        let router = routes(state(Some(Arc::new(CloudBackend::in_memory("drop"))), true));
        let mut request = call("/saveRawData", json!({"data": {"k": "v"}}));
        request
            .headers_mut()
            .insert(APP_CHECK_HEADER, "token".parse().unwrap());

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn app_check_gate_leaves_health_open() {
        let router = routes(state(Some(Arc::new(CloudBackend::in_memory("drop"))), true));
        let response = router
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
