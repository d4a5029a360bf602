//! Runtime configuration loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::QueuePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the queue keeps its files, plus the queue policy.
///
/// ```json
/// {
///   "data_dir": "/var/lib/shutter",
///   "object_root": "/srv/photos",
///   "policy": { "max_attempts": 3 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutterConfig {
    /// Directory holding the persisted queue and the record documents.
    pub data_dir: PathBuf,

    /// Root directory of the file-backed object store.
    pub object_root: PathBuf,

    pub policy: QueuePolicy,
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".shutter"),
            object_root: PathBuf::from(".shutter/objects"),
            policy: QueuePolicy::default(),
        }
    }
}

impl ShutterConfig {
    pub const QUEUE_FILE: &'static str = "upload_queue.json";
    pub const RECORDS_FILE: &'static str = "photo_records.json";

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Config rooted at `data_dir`, objects under `data_dir/objects`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            object_root: data_dir.join("objects"),
            data_dir,
            policy: QueuePolicy::default(),
        }
    }

    pub fn queue_file(&self) -> PathBuf {
        self.data_dir.join(Self::QUEUE_FILE)
    }

    pub fn records_file(&self) -> PathBuf {
        self.data_dir.join(Self::RECORDS_FILE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.object_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("object_root must not be empty".into()));
        }
        self.policy.validate()
    }
}
