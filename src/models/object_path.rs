//! Storage key of a persisted payload.

use std::fmt;

/// An object key kept as its ordered `/`-separated segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<String>,
}

impl ObjectPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Full key as stored in the bucket.
    pub fn key(&self) -> String {
        self.segments.join("/")
    }

    /// Check that every backend stores this key verbatim.
    ///
    /// Routing values may themselves contain `/`, so the check runs on the
    /// joined key: no empty, `.` or `..` segment and no control character.
    pub fn ensure_storable(&self) -> Result<(), String> {
        let key = self.key();
        for segment in key.split('/') {
            if segment.is_empty() {
                return Err(format!("Storage path `{key}` contains an empty segment."));
            }
            if segment == "." || segment == ".." {
                return Err(format!("Storage path `{key}` contains a `{segment}` segment."));
            }
            if segment.chars().any(|c| c.is_control()) {
                return Err(format!("Storage path `{key}` contains a control character."));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
