//! Payload serialization and the final object write.

use crate::{
    errors::IngestError,
    models::object_path::ObjectPath,
    services::storage_backend::StorageBackend,
};
use bytes::Bytes;
use serde_json::Value;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize a payload for storage.
///
/// Arrays become newline-delimited JSON, one element per line with no
/// trailing newline; anything else is a single JSON document.
pub fn encode_payload(payload: &Value) -> Result<Bytes, IngestError> {
    let text = match payload {
        Value::Array(items) => items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map(|lines| lines.join("\n")),
        other => serde_json::to_string(other),
    }
    .map_err(|e| IngestError::internal(format!("Failed to serialize payload: {}", e)))?;

    Ok(Bytes::from(text))
}

/// Store `payload` at `path` and return its locator.
pub async fn write_object(
    backend: &dyn StorageBackend,
    path: &ObjectPath,
    payload: &Value,
) -> Result<String, IngestError> {
    let body = encode_payload(payload)?;
    let key = path.key();
    let size = body.len();

    backend
        .put(&key, body, JSON_CONTENT_TYPE)
        .await
        .map_err(|e| IngestError::internal(format!("Failed to save data: {}", e)))?;

    let locator = backend.locator(&key);
    tracing::info!(file = %locator, size_bytes = size, "Saved payload");
    Ok(locator)
}
