//! Cloud object storage backed by the `object_store` crate.

use crate::services::storage_backend::{BackendError, BackendResult, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload,
};
use std::sync::Arc;

/// A bucket in a cloud object store (GCS, S3) or in process memory.
#[derive(Clone)]
pub struct CloudBackend {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    scheme: &'static str,
}

impl CloudBackend {
    /// Wrap an already configured store.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, scheme: &'static str) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            scheme,
        }
    }

    /// Google Cloud Storage, credentials resolved from the environment
    /// (`GOOGLE_APPLICATION_CREDENTIALS`, `GOOGLE_SERVICE_ACCOUNT`, ...).
    pub fn gcs(bucket: &str) -> BackendResult<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| BackendError::other(e.to_string()))?;
        Ok(Self::new(Arc::new(store), bucket, "gs"))
    }

    /// Amazon S3; region and credentials come from the `AWS_*` environment.
    ///
    /// `endpoint_url` targets S3-compatible providers such as MinIO.
    pub fn s3(bucket: &str, endpoint_url: Option<&str>) -> BackendResult<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(allow_http);
        }
        let store = builder
            .build()
            .map_err(|e| BackendError::other(e.to_string()))?;
        Ok(Self::new(Arc::new(store), bucket, "s3"))
    }

    /// Volatile in-process store.
    pub fn in_memory(bucket: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket, "memory")
    }

    /// Underlying store, used to read objects back.
    #[cfg(test)]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

/// Parse `key` without any rewriting; keys the store would encode or
/// normalize are rejected with a 400 so the locator always names the object.
fn parse_location(key: &str) -> BackendResult<Path> {
    match Path::parse(key) {
        Ok(path) if path.as_ref() == key => Ok(path),
        Ok(_) => Err(BackendError::with_status(400, format!("invalid object key `{key}`"))),
        Err(e) => Err(BackendError::with_status(400, e.to_string())),
    }
}

/// Translate an `object_store` error, keeping credential failures recognizable.
fn classify(err: ObjectStoreError) -> BackendError {
    let status = match &err {
        ObjectStoreError::Unauthenticated { .. } => Some(401),
        ObjectStoreError::PermissionDenied { .. } => Some(403),
        ObjectStoreError::NotFound { .. } => Some(404),
        _ => None,
    };
    BackendError::new(status, err.to_string())
}

#[async_trait]
impl StorageBackend for CloudBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn scheme(&self) -> &'static str {
        self.scheme
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> BackendResult<()> {
        let location = parse_location(key)?;
        let size = body.len();
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(body), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object put failed"
                );
                classify(e)
            })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object put successful"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        let location = parse_location(key)?;
        self.store.delete(&location).await.map_err(classify)?;
        tracing::debug!(bucket = %self.bucket, key = %key, "Object deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_records_body_and_content_type() {
        let backend = CloudBackend::in_memory("drop");
        backend
            .put("a/b/c.json", Bytes::from_static(b"{\"x\":1}"), "application/json")
            .await
            .unwrap();

        let result = backend.store().get(&Path::from("a/b/c.json")).await.unwrap();
        let content_type: Option<&str> =
            result.attributes.get(&Attribute::ContentType).map(|v| v.as_ref());
        assert_eq!(content_type, Some("application/json"));
        let bytes = result.bytes().await.unwrap();
        assert_eq!(&bytes[..], b"{\"x\":1}");
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let backend = CloudBackend::in_memory("drop");
        backend
            .put("probe.txt", Bytes::from_static(b"ok"), "text/plain")
            .await
            .unwrap();
        backend.delete("probe.txt").await.unwrap();
        assert!(backend.store().head(&Path::from("probe.txt")).await.is_err());
    }

    #[tokio::test]
    async fn keys_are_stored_verbatim() {
        use futures::TryStreamExt;

        let backend = CloudBackend::in_memory("drop");
        let key = "orders/20240302/order#1 [a]%_1000.json";
        backend
            .put(key, Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        let stored: Vec<String> = backend
            .store()
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(stored, vec![key.to_string()]);
    }

    #[tokio::test]
    async fn rewritten_keys_are_rejected() {
        let backend = CloudBackend::in_memory("drop");
        for key in ["orders//x.json", "x/../y.json", "/lead.json", "trail/"] {
            let err = backend
                .put(key, Bytes::from_static(b"{}"), "application/json")
                .await
                .unwrap_err();
            assert_eq!(err.status, Some(400), "{key}");
            assert_eq!(backend.delete(key).await.unwrap_err().status, Some(400));
        }
    }

    #[test]
    fn locator_uses_scheme_and_bucket() {
        let backend = CloudBackend::in_memory("drop");
        assert_eq!(backend.locator("x/y.json"), "memory://drop/x/y.json");
    }

    #[test]
    fn credential_errors_carry_status() {
        let denied = classify(ObjectStoreError::PermissionDenied {
            path: "k".into(),
            source: "forbidden".into(),
        });
        assert_eq!(denied.status, Some(403));

        let unauthenticated = classify(ObjectStoreError::Unauthenticated {
            path: "k".into(),
            source: "no token".into(),
        });
        assert_eq!(unauthenticated.status, Some(401));

        let generic = classify(ObjectStoreError::Generic {
            store: "GCS",
            source: "quota exceeded".into(),
        });
        assert_eq!(generic.status, None);
        assert!(generic.message.contains("quota exceeded"));
    }
}
