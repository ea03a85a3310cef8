//! Storage abstraction consumed by the ingestion flow.
//!
//! A backend is bound to exactly one bucket at construction time and only
//! needs two primitives: a single-shot `put` and a `delete`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failure reported by a storage backend.
///
/// `status` carries an HTTP-style code when the backend reports one
/// (401/403 for credential problems); `message` is the backend's own text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the bucket this backend writes into.
    fn bucket(&self) -> &str;

    /// URL scheme used in locators, e.g. `gs`.
    fn scheme(&self) -> &'static str;

    /// Write `body` at `key` in one call, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> BackendResult<()>;

    /// Remove the object at `key`.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    /// `<scheme>://<bucket>/<key>`
    fn locator(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme(), self.bucket(), key)
    }
}
