//! Local filesystem adapters: captured photos on disk, and a directory that
//! stands in for the remote object store.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{Locator, UploadError};
use crate::ports::{ObjectStore, PayloadSource};

use super::json_file::write_atomically;

/// Reads payloads from local paths or `file://` URIs.
///
/// Every read error, whatever its kind, becomes `SourceUnavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPayloadSource;

impl FsPayloadSource {
    fn local_path(source: &str) -> &str {
        source.strip_prefix("file://").unwrap_or(source)
    }
}

#[async_trait]
impl PayloadSource for FsPayloadSource {
    async fn read(&self, source: &str) -> Result<Vec<u8>, UploadError> {
        let path = Self::local_path(source);
        tokio::fs::read(path)
            .await
            .map_err(|err| UploadError::SourceUnavailable(format!("{path}: {err}")))
    }
}

/// Object store backed by a directory. Locators are `file://` URIs.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` under the root. Only plain relative paths are accepted.
    fn resolve(&self, path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(path);
        if path.is_empty() {
            return Err(UploadError::InvalidDestination("empty path".into()));
        }
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain {
            return Err(UploadError::InvalidDestination(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn map_write_error(path: &str, err: io::Error) -> UploadError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => UploadError::PermissionDenied(path.to_string()),
        _ => UploadError::remote("storage/io", format!("{path}: {err}")),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Locator, UploadError> {
        let target = self.resolve(path)?;
        write_atomically(&target, &bytes)
            .await
            .map_err(|err| map_write_error(path, err))?;
        Ok(Locator::new(format!("file://{}", target.display())))
    }
}
