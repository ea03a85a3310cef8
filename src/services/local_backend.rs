//! Local-disk bucket: objects live at `{base_path}/{bucket}/{key}`.
//!
//! Each object gets a `{key}.meta.json` sidecar holding its content type,
//! size and MD5 etag, since a plain file has nowhere else to keep them.
//! Writes go through a temp file that is fsynced and renamed into place.

use crate::services::storage_backend::{BackendError, BackendResult, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const SIDECAR_SUFFIX: &str = ".meta.json";

/// Metadata stored next to every object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub content_type: String,
    pub size_bytes: u64,
    pub etag: String,
}

#[derive(Clone, Debug)]
pub struct LocalBackend {
    /// Directory holding all bucket directories.
    base_path: PathBuf,
    bucket: String,
}

impl LocalBackend {
    /// Create the bucket directory beneath `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>, bucket: &str) -> BackendResult<Self> {
        ensure_bucket_name_safe(bucket)?;
        let backend = Self {
            base_path: base_path.into(),
            bucket: bucket.to_string(),
        };
        fs::create_dir_all(backend.bucket_root())
            .await
            .map_err(|e| io_error("create bucket directory", e))?;
        Ok(backend)
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Resolve `key` inside the bucket directory.
    fn object_path(&self, key: &str) -> BackendResult<PathBuf> {
        ensure_key_safe(key)?;
        Ok(self.bucket_root().join(key))
    }

    /// Read the sidecar metadata of a stored object.
    #[cfg(test)]
    pub async fn read_meta(&self, key: &str) -> BackendResult<ObjectMeta> {
        let path = sidecar_path(&self.object_path(key)?);
        let raw = fs::read(&path)
            .await
            .map_err(|e| io_error("read object metadata", e))?;
        serde_json::from_slice(&raw).map_err(|e| BackendError::other(e.to_string()))
    }

    /// Remove empty directories from `start` upwards, stopping at the bucket root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.bucket_root();
        let mut current = start.to_path_buf();
        while current.starts_with(&stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> BackendResult<()> {
        let file_path = self.object_path(key)?;
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| BackendError::other("object path missing parent directory"))?;
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| io_error("create object directory", e))?;

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size_bytes: body.len() as u64,
            etag: format!("{:x}", md5::compute(&body)),
        };
        let meta_bytes =
            serde_json::to_vec(&meta).map_err(|e| BackendError::other(e.to_string()))?;

        write_atomic(&parent, &file_path, &body).await?;
        let sidecar = sidecar_path(&file_path);
        if let Err(err) = write_atomic(&parent, &sidecar, &meta_bytes).await {
            // a sidecar describing the previous object must not outlive it
            let _ = fs::remove_file(&sidecar).await;
            return Err(err);
        }

        debug!(
            path = %file_path.display(),
            size_bytes = meta.size_bytes,
            etag = %meta.etag,
            "Local object written"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        let file_path = self.object_path(key)?;
        for path in [file_path.clone(), sidecar_path(&file_path)] {
            match fs::remove_file(&path).await {
                Ok(_) => debug!("removed {}", path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", path.display());
                }
                Err(err) => return Err(io_error("delete object", err)),
            }
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }
}

/// Write `bytes` to a temp file in `dir`, fsync, then rename onto `target`.
async fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> BackendResult<()> {
    let tmp_path = dir.join(format!(".tmp-{}", Uuid::new_v4()));
    let result = async {
        let mut file = File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, target).await
    }
    .await;

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(io_error("write object", err));
    }
    Ok(())
}

fn sidecar_path(object_path: &Path) -> PathBuf {
    let mut name = object_path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// OS permission failures become a 403 so they classify like cloud ACL errors.
fn io_error(action: &str, err: io::Error) -> BackendError {
    let status = match err.kind() {
        ErrorKind::PermissionDenied => Some(403),
        ErrorKind::NotFound => Some(404),
        _ => None,
    };
    BackendError::new(status, format!("{action}: {err}"))
}

/// Reject keys that could escape the bucket directory.
fn ensure_key_safe(key: &str) -> BackendResult<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_OBJECT_KEY_LEN
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains("..")
        || key.ends_with(SIDECAR_SUFFIX)
        || key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
    if invalid {
        return Err(BackendError::with_status(400, format!("invalid object key `{key}`")));
    }
    Ok(())
}

/// Bucket names double as directory names: 3–63 chars of `[a-z0-9.-_]`,
/// starting and ending with a letter or digit.
fn ensure_bucket_name_safe(name: &str) -> BackendResult<()> {
    let len_ok = (BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-' | '_'));
    let edges_ok = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if !(len_ok && chars_ok && edges_ok) || name.contains("..") {
        return Err(BackendError::other(format!("bucket name `{name}` is invalid")));
    }
    Ok(())
}
