//! Recording backend with scripted failures.

use crate::services::storage_backend::{BackendError, BackendResult, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct ScriptedBackend {
    put_error: Option<BackendError>,
    delete_error: Option<BackendError>,
    puts: Mutex<Vec<RecordedPut>>,
    deletes: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `put` fails with `err` (and is still recorded).
    pub fn fail_put(mut self, err: BackendError) -> Self {
        self.put_error = Some(err);
        self
    }

    pub fn fail_delete(mut self, err: BackendError) -> Self {
        self.delete_error = Some(err);
        self
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.puts.lock().unwrap().len() + self.deletes.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    fn scheme(&self) -> &'static str {
        "mock"
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> BackendResult<()> {
        self.puts.lock().unwrap().push(RecordedPut {
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        match &self.put_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        match &self.delete_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
