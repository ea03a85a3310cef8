//! Payload shape validation and reserved-field stripping.

use crate::{
    errors::IngestError,
    models::{
        request::{Routing, SanitizedRequest},
        variant::{
            ATTRIBUTION_FILE_NAME, ATTRIBUTION_FOLDER_PREFIX, EVENT_APP_ID, EVENT_FOLDER_PREFIX,
            EVENT_USER_PSEUDO_ID, IngestVariant, PAYLOAD_FIELD,
        },
    },
};
use serde_json::{Map, Value};
use tracing::debug;

/// Validate a caller's request and split it into routing values and payload.
///
/// The request must be a non-empty JSON object. The variant's reserved keys
/// are removed, required ones must be present and non-empty. A non-null
/// explicit payload replaces the remaining fields, which are then discarded.
pub fn sanitize(variant: IngestVariant, data: Value) -> Result<SanitizedRequest, IngestError> {
    let fields = match data {
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            return Err(IngestError::invalid_argument(
                "Payload must be a non-empty JSON object.",
            ));
        }
    };

    let (mut reserved, remaining) = split_reserved(fields, variant.reserved_keys());

    let routing = match variant {
        IngestVariant::Attribution => {
            let file_name = routing_text(&reserved, ATTRIBUTION_FILE_NAME)?;
            let folder_prefix = routing_text(&reserved, ATTRIBUTION_FOLDER_PREFIX)?;
            match (file_name, folder_prefix) {
                (Some(file_name), Some(folder_prefix)) => Routing::Attribution {
                    file_name,
                    folder_prefix,
                },
                _ => {
                    return Err(IngestError::invalid_argument(format!(
                        "Missing {ATTRIBUTION_FILE_NAME} or {ATTRIBUTION_FOLDER_PREFIX}."
                    )));
                }
            }
        }
        IngestVariant::Event => {
            let user_pseudo_id = match reserved.get(EVENT_USER_PSEUDO_ID) {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                _ => {
                    return Err(IngestError::invalid_argument(format!(
                        "{EVENT_USER_PSEUDO_ID} must be a non-empty string."
                    )));
                }
            };
            let folder_prefix = routing_text(&reserved, EVENT_FOLDER_PREFIX)?.ok_or_else(|| {
                IngestError::invalid_argument(format!("Missing {EVENT_FOLDER_PREFIX}."))
            })?;
            Routing::Event {
                folder_prefix,
                user_pseudo_id,
                app_id: routing_text(&reserved, EVENT_APP_ID)?,
            }
        }
        IngestVariant::Raw => Routing::Raw,
    };

    let explicit = if variant.accepts_explicit_payload() {
        reserved.remove(PAYLOAD_FIELD).filter(|v| !v.is_null())
    } else {
        None
    };
    let payload = match explicit {
        Some(payload) => {
            if !remaining.is_empty() {
                debug!(
                    procedure = %variant,
                    dropped = ?remaining.keys().collect::<Vec<_>>(),
                    "Explicit payload given, other fields are not persisted"
                );
            }
            payload
        }
        None => Value::Object(remaining),
    };

    Ok(SanitizedRequest { routing, payload })
}

/// Partition `fields` into (reserved, remaining), keeping the caller's key order.
pub fn split_reserved(fields: Map<String, Value>, keys: &[&str]) -> (Map<String, Value>, Map<String, Value>) {
    let mut reserved = Map::new();
    let mut remaining = Map::new();
    for (key, value) in fields {
        if keys.contains(&key.as_str()) {
            reserved.insert(key, value);
        } else {
            remaining.insert(key, value);
        }
    }
    (reserved, remaining)
}

/// Text of a routing field; absent, `null`, `""`, `false` and `0` all read
/// as `None`.
fn routing_text(reserved: &Map<String, Value>, key: &str) -> Result<Option<String>, IngestError> {
    match reserved.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(true)) => Ok(Some(true.to_string())),
        Some(Value::Array(_) | Value::Object(_)) => Err(IngestError::invalid_argument(format!(
            "{key} must be a string."
        ))),
    }
}
