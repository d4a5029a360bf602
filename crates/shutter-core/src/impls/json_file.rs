//! JSON file adapters for the task list and the record documents.
//!
//! Both write through a temp file and a rename, so a crash mid-write leaves
//! the previous file in place.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{OwnerId, PhotoRecord, RecordId, RecordUpdate, UploadTask};
use crate::ports::{RecordStore, RecordStoreError, StoreError, TaskStore};

/// `<path>.<suffix>` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Writes `bytes` to `path` via `<path>.tmp` and a rename.
///
/// Some platforms refuse to rename over an existing file; the target is
/// removed and the rename retried once. If that also fails the temp file is
/// kept, and `read_current` falls back to it.
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = sibling(path, "tmp");
    tokio::fs::write(&tmp, bytes).await?;
    match tokio::fs::rename(&tmp, path).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::remove_file(path).await.ok();
            tokio::fs::rename(&tmp, path).await
        }
    }
}

/// Reads `path`, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Reads `path`, or the `<path>.tmp` a failed `write_atomically` left behind
/// when `path` itself is gone. Returns the file actually read.
async fn read_current(path: &Path) -> io::Result<Option<(PathBuf, Vec<u8>)>> {
    if let Some(bytes) = read_optional(path).await? {
        return Ok(Some((path.to_path_buf(), bytes)));
    }
    let tmp = sibling(path, "tmp");
    let found = read_optional(&tmp).await?;
    if found.is_some() {
        warn!(path = %path.display(), "file missing; recovering from the temp copy");
    }
    Ok(found.map(|bytes| (tmp, bytes)))
}

// ========================================
// JsonFileTaskStore
// ========================================

/// Task list stored as one JSON array.
///
/// A file that does not parse is renamed to `<file>.corrupt` and reported as
/// `StoreError::Corrupt`; the queue then starts empty instead of failing
/// every later load on the same bytes.
#[derive(Debug, Clone)]
pub struct JsonFileTaskStore {
    path: PathBuf,
}

impl JsonFileTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn load(&self) -> Result<Vec<UploadTask>, StoreError> {
        let Some((read_from, bytes)) = read_current(&self.path).await.map_err(|e| self.io_error(e))? else {
            debug!(path = %self.path.display(), "no queue file; starting empty");
            return Ok(Vec::new());
        };
        match serde_json::from_slice::<Vec<UploadTask>>(&bytes) {
            Ok(tasks) => Ok(tasks),
            Err(source) => {
                let quarantined = sibling(&self.path, "corrupt");
                if let Err(err) = tokio::fs::rename(&read_from, &quarantined).await {
                    warn!(path = %self.path.display(), error = %err, "could not move corrupt queue file aside");
                }
                Err(StoreError::Corrupt {
                    path: self.path.clone(),
                    quarantined,
                    source,
                })
            }
        }
    }

    async fn save_all(&self, tasks: &[UploadTask]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(tasks)?;
        write_atomically(&self.path, &bytes)
            .await
            .map_err(|e| self.io_error(e))
    }
}

// ========================================
// JsonFileRecordStore
// ========================================

/// Record documents kept in one JSON file, keyed `{owner}/{id}`.
///
/// Stands in for a remote document store when running locally. I/O errors
/// surface as `Unavailable`, which the queue treats as connectivity-class.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    records: Mutex<Option<BTreeMap<String, PhotoRecord>>>,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    fn key(owner_id: &OwnerId, id: &RecordId) -> String {
        format!("{owner_id}/{id}")
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> RecordStoreError {
        RecordStoreError::Unavailable(format!("{}: {err}", self.path.display()))
    }

    async fn read_all(&self) -> Result<BTreeMap<String, PhotoRecord>, RecordStoreError> {
        match read_current(&self.path).await.map_err(|e| self.unavailable(e))? {
            Some((_, bytes)) => serde_json::from_slice(&bytes).map_err(|e| self.unavailable(e)),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn persist(&self, records: &BTreeMap<String, PhotoRecord>) -> Result<(), RecordStoreError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|e| self.unavailable(e))?;
        write_atomically(&self.path, &bytes)
            .await
            .map_err(|e| self.unavailable(e))
    }

    /// Reads one record.
    pub async fn get(&self, owner_id: &OwnerId, id: &RecordId) -> Result<Option<PhotoRecord>, RecordStoreError> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_all().await?);
        }
        Ok(guard
            .as_ref()
            .and_then(|records| records.get(&Self::key(owner_id, id)))
            .cloned())
    }

    /// All records, ordered by key.
    pub async fn list(&self) -> Result<Vec<PhotoRecord>, RecordStoreError> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_all().await?);
        }
        Ok(guard
            .as_ref()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn create(&self, record: PhotoRecord) -> Result<(), RecordStoreError> {
        let mut guard = self.records.lock().await;
        let mut records = match guard.take() {
            Some(records) => records,
            None => self.read_all().await?,
        };
        records.insert(Self::key(&record.owner_id, &record.id), record);
        let result = self.persist(&records).await;
        *guard = Some(records);
        result
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &RecordId,
        update: RecordUpdate,
    ) -> Result<(), RecordStoreError> {
        let mut guard = self.records.lock().await;
        let mut records = match guard.take() {
            Some(records) => records,
            None => self.read_all().await?,
        };
        let result = match records.get_mut(&Self::key(owner_id, id)) {
            Some(record) => {
                let previous = record.clone();
                record.apply(&update);
                let result = self.persist(&records).await;
                if result.is_err() {
                    // keep memory in step with the file
                    records.insert(Self::key(owner_id, id), previous);
                }
                result
            }
            None => Err(RecordStoreError::NotFound {
                owner_id: owner_id.clone(),
                id: id.clone(),
            }),
        };
        *guard = Some(records);
        result
    }
}
