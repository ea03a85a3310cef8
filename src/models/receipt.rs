use serde::Serialize;

/// Successful result of an ingest call, returned under `result`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub success: bool,
    /// Locator of the stored object, `<scheme>://<bucket>/<key>`.
    pub file_path: String,
}

impl IngestReceipt {
    pub fn stored_at(file_path: String) -> Self {
        Self {
            success: true,
            file_path,
        }
    }
}
