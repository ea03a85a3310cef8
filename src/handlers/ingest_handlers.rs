//! Callable-procedure handlers.
//!
//! Wire format: the request body is `{"data": ...}`, a success is answered
//! with `{"result": ...}` and a failure with the `IngestError` envelope.

use crate::{
    errors::IngestError,
    models::{receipt::IngestReceipt, variant::IngestVariant},
    state::AppState,
};
use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

/// `POST /saveAttributionData`
pub async fn save_attribution_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CallableResponse<IngestReceipt>>, IngestError> {
    call(&state, IngestVariant::Attribution, &body).await
}

/// `POST /saveEventData`
pub async fn save_event_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CallableResponse<IngestReceipt>>, IngestError> {
    call(&state, IngestVariant::Event, &body).await
}

/// `POST /saveRawData`
pub async fn save_raw_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CallableResponse<IngestReceipt>>, IngestError> {
    call(&state, IngestVariant::Raw, &body).await
}

async fn call(
    state: &AppState,
    variant: IngestVariant,
    body: &[u8],
) -> Result<Json<CallableResponse<IngestReceipt>>, IngestError> {
    let data = unwrap_envelope(body)?;

    match state.ingest.ingest(variant, data).await {
        Ok(receipt) => Ok(Json(CallableResponse { result: receipt })),
        Err(err) => {
            tracing::warn!(procedure = %variant, kind = err.kind(), error = %err, "Ingest call failed");
            Err(err)
        }
    }
}

/// Pull `data` out of the callable request envelope.
fn unwrap_envelope(body: &[u8]) -> Result<Value, IngestError> {
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|_| IngestError::invalid_argument("Bad Request: body is not valid JSON."))?;

    match envelope {
        Value::Object(mut fields) => fields.remove("data"),
        _ => None,
    }
    .ok_or_else(|| IngestError::invalid_argument("Bad Request: missing `data` field."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_yields_data() {
        let data = unwrap_envelope(br#"{"data":{"a":1}}"#).unwrap();
        assert_eq!(data, json!({"a": 1}));

        let data = unwrap_envelope(br#"{"data":null}"#).unwrap();
        assert_eq!(data, Value::Null);
    }

    #[test]
    fn malformed_envelopes_are_invalid() {
        let bodies: [&[u8]; 4] = [b"not json", br#"{"a":1}"#, b"[1,2]", b""];
        for body in bodies {
            assert!(matches!(
                unwrap_envelope(body),
                Err(IngestError::InvalidArgument(_))
            ));
        }
    }
}
