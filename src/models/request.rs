use serde_json::Value;

/// Routing values extracted from the reserved fields of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    Attribution {
        file_name: String,
        folder_prefix: String,
    },
    Event {
        folder_prefix: String,
        user_pseudo_id: String,
        app_id: Option<String>,
    },
    Raw,
}

/// A validated request: routing values plus the payload that gets persisted.
///
/// `payload` never contains any reserved key of the variant it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedRequest {
    pub routing: Routing,
    pub payload: Value,
}
