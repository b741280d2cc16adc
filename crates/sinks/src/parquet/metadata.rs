//! Persisted writer metadata
//!
//! A `metadata.json` lives alongside the rotated files and carries the
//! rotation counter across restarts, so a restarted writer never reuses a
//! file name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::WriterError;

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterMetadata {
    /// Stable writer identity
    pub writer_id: String,

    /// Next file id to allocate
    pub next_id: u64,
}

impl Default for WriterMetadata {
    fn default() -> Self {
        Self {
            writer_id: "default".into(),
            next_id: 0,
        }
    }
}

/// Loads and persists [`WriterMetadata`] in a base directory
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join("metadata.json"),
        }
    }

    /// Read the metadata file; an absent file yields the defaults.
    pub fn load(&self) -> Result<WriterMetadata, WriterError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| WriterError::init(format!("corrupt metadata.json: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WriterMetadata::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the metadata.
    pub fn save(&self, metadata: &WriterMetadata) -> Result<(), WriterError> {
        let bytes = serde_json::to_vec(metadata)
            .map_err(|e| WriterError::flush(format!("serialize metadata: {e}")))?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}
