//! Write-permission probe run ahead of the real write.
//!
//! A passing probe does not guarantee the following write succeeds: ACLs can
//! change in between.

use crate::{
    errors::IngestError,
    services::storage_backend::{BackendError, StorageBackend},
};
use bytes::Bytes;
use uuid::Uuid;

/// Sentinel prefix holding probe markers.
pub const PROBE_PREFIX: &str = "_write_probe";

pub const PERMISSION_DENIED_MESSAGE: &str =
    "The service does not have permission to write to the target bucket.";

/// Write and remove a throwaway marker to check that the bucket is writable.
///
/// Failing to remove the marker is logged and otherwise ignored.
pub async fn verify_write_access(backend: &dyn StorageBackend) -> Result<(), IngestError> {
    let key = format!("{}/{}.txt", PROBE_PREFIX, Uuid::new_v4());

    if let Err(err) = backend
        .put(&key, Bytes::from_static(b"write-probe"), "text/plain")
        .await
    {
        tracing::warn!(
            bucket = %backend.bucket(),
            status = ?err.status,
            error = %err,
            "Write probe failed"
        );
        return Err(classify_probe_failure(&err));
    }

    if let Err(err) = backend.delete(&key).await {
        tracing::warn!(
            bucket = %backend.bucket(),
            key = %key,
            error = %err,
            "Could not remove write probe marker"
        );
    }

    tracing::debug!(bucket = %backend.bucket(), "Write probe passed");
    Ok(())
}

/// 401/403 or a message mentioning permissions reads as a denied write.
pub fn classify_probe_failure(err: &BackendError) -> IngestError {
    let denied = matches!(err.status, Some(401 | 403))
        || err.message.to_ascii_lowercase().contains("permission");
    if denied {
        IngestError::PermissionDenied(PERMISSION_DENIED_MESSAGE.into())
    } else {
        IngestError::internal(format!("Permission check failed: {}", err.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::ScriptedBackend;

    #[test]
    fn classifies_credential_statuses_as_denied() {
        for status in [401, 403] {
            let err = classify_probe_failure(&BackendError::with_status(status, "forbidden"));
            assert_eq!(err, IngestError::PermissionDenied(PERMISSION_DENIED_MESSAGE.into()));
        }
    }

    #[test]
    fn classifies_permission_messages_as_denied() {
        let err = classify_probe_failure(&BackendError::other(
            "caller does not have storage.objects.create Permission",
        ));
        assert!(matches!(err, IngestError::PermissionDenied(_)));
    }

    #[test]
    fn other_failures_are_internal_with_message() {
        let err = classify_probe_failure(&BackendError::with_status(500, "backend unavailable"));
        assert_eq!(
            err,
            IngestError::internal("Permission check failed: backend unavailable")
        );

        let err = classify_probe_failure(&BackendError::other("connection reset"));
        assert!(matches!(err, IngestError::Internal(ref m) if m.contains("connection reset")));
    }

    #[tokio::test]
    async fn probe_writes_text_marker_and_removes_it() {
        let backend = ScriptedBackend::new();
        verify_write_access(&backend).await.unwrap();

        let puts = backend.puts();
        assert_eq!(puts.len(), 1);
        assert!(puts[0].key.starts_with("_write_probe/"));
        assert_eq!(puts[0].content_type, "text/plain");
        assert_eq!(backend.deletes(), vec![puts[0].key.clone()]);
    }

    #[tokio::test]
    async fn failed_cleanup_is_not_escalated() {
        let backend = ScriptedBackend::new().fail_delete(BackendError::with_status(500, "gone"));
        verify_write_access(&backend).await.unwrap();
    }

    #[tokio::test]
    async fn denied_probe_skips_cleanup() {
        let backend = ScriptedBackend::new().fail_put(BackendError::with_status(403, "denied"));
        let err = verify_write_access(&backend).await.unwrap_err();
        assert!(matches!(err, IngestError::PermissionDenied(_)));
        assert!(backend.deletes().is_empty());
    }
}
