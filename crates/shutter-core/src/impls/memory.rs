//! 全ポートのインメモリ実装
//!
//! テストと CLI のドライランで使う。どれも失敗モードに切り替えられるので、
//! キューの劣化時の経路を試せる。

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{Locator, OwnerId, PhotoRecord, RecordId, RecordUpdate, UploadError, UploadStatus, UploadTask};
use crate::ports::{ObjectStore, PayloadSource, RecordStore, RecordStoreError, StoreError, TaskStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ========================================
// TaskStore
// ========================================

/// メモリ上のタスクリスト
#[derive(Debug)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<UploadTask>>,
    available: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    /// 前回の実行が残したかのように `tasks` を持った状態で作る
    pub fn with_tasks(tasks: Vec<UploadTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            available: AtomicBool::new(true),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    /// 無効の間は `load` も `save_all` も失敗する
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Last successfully saved list.
    pub async fn saved(&self) -> Vec<UploadTask> {
        lock(&self.tasks).clone()
    }

    /// Overwrites the stored list without going through the queue.
    pub async fn replace(&self, tasks: Vec<UploadTask>) {
        *lock(&self.tasks) = tasks;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self) -> Result<Vec<UploadTask>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(lock(&self.tasks).clone())
    }

    async fn save_all(&self, tasks: &[UploadTask]) -> Result<(), StoreError> {
        self.check_available()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        *lock(&self.tasks) = tasks.to_vec();
        Ok(())
    }
}

// ========================================
// RecordStore
// ========================================

type RecordKey = (OwnerId, RecordId);

#[derive(Debug, Default)]
struct RecordState {
    records: HashMap<RecordKey, PhotoRecord>,
    /// Every status written per record, in order.
    history: HashMap<RecordKey, Vec<UploadStatus>>,
}

/// メモリ上のドキュメントストア
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: Mutex<RecordState>,
    offline: AtomicBool,
    refused_states: Mutex<HashSet<&'static str>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// オフラインの間はすべて `Unavailable` で失敗
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Updates that move a record into `state` (a status label such as
    /// `"syncing"`) fail with `Unavailable`; all other writes go through.
    pub fn refuse_state(&self, state: &'static str) {
        lock(&self.refused_states).insert(state);
    }

    pub fn clear_refusals(&self) {
        lock(&self.refused_states).clear();
    }

    pub async fn get(&self, owner_id: &OwnerId, id: &RecordId) -> Option<PhotoRecord> {
        lock(&self.state)
            .records
            .get(&(owner_id.clone(), id.clone()))
            .cloned()
    }

    /// Statuses written to a record, creation included.
    pub async fn history(&self, owner_id: &OwnerId, id: &RecordId) -> Vec<UploadStatus> {
        lock(&self.state)
            .history
            .get(&(owner_id.clone(), id.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        lock(&self.state).records.len()
    }

    fn check_online(&self) -> Result<(), RecordStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RecordStoreError::Unavailable("record store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, record: PhotoRecord) -> Result<(), RecordStoreError> {
        self.check_online()?;
        let key = (record.owner_id.clone(), record.id.clone());
        let mut state = lock(&self.state);
        state.history.entry(key.clone()).or_default().push(record.status.clone());
        state.records.insert(key, record);
        Ok(())
    }

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &RecordId,
        update: RecordUpdate,
    ) -> Result<(), RecordStoreError> {
        self.check_online()?;
        if lock(&self.refused_states).contains(update.status.label()) {
            return Err(RecordStoreError::Unavailable(format!(
                "write of {} refused",
                update.status
            )));
        }
        let key = (owner_id.clone(), id.clone());
        let mut state = lock(&self.state);
        let Some(record) = state.records.get_mut(&key) else {
            return Err(RecordStoreError::NotFound {
                owner_id: owner_id.clone(),
                id: id.clone(),
            });
        };
        record.apply(&update);
        state.history.entry(key).or_default().push(update.status);
        Ok(())
    }
}

// ========================================
// ObjectStore
// ========================================

#[derive(Debug, Default)]
struct ObjectState {
    objects: HashMap<String, Vec<u8>>,
    puts: HashMap<String, usize>,
    scripted: HashMap<String, VecDeque<UploadError>>,
    always: HashMap<String, UploadError>,
}

/// メモリ上のオブジェクトストア。locator は `memory://{path}`
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    state: Mutex<ObjectState>,
    offline: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every put fails with `UploadError::Offline`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The next puts to `path` fail with `errors`, one per call, in order.
    pub fn fail_next(&self, path: &str, errors: impl IntoIterator<Item = UploadError>) {
        lock(&self.state)
            .scripted
            .entry(path.to_string())
            .or_default()
            .extend(errors);
    }

    /// Every put to `path` fails with `error` until `heal` is called.
    pub fn fail_always(&self, path: &str, error: UploadError) {
        lock(&self.state).always.insert(path.to_string(), error);
    }

    pub fn heal(&self, path: &str) {
        let mut state = lock(&self.state);
        state.always.remove(path);
        state.scripted.remove(path);
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).objects.get(path).cloned()
    }

    /// Put calls seen for `path`, failed ones included.
    pub fn put_count(&self, path: &str) -> usize {
        lock(&self.state).puts.get(path).copied().unwrap_or(0)
    }

    pub fn total_puts(&self) -> usize {
        lock(&self.state).puts.values().sum()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Locator, UploadError> {
        let mut state = lock(&self.state);
        *state.puts.entry(path.to_string()).or_default() += 1;
        if self.offline.load(Ordering::SeqCst) {
            return Err(UploadError::Offline("object store offline".into()));
        }
        if let Some(err) = state.scripted.get_mut(path).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if let Some(err) = state.always.get(path) {
            return Err(err.clone());
        }
        state.objects.insert(path.to_string(), bytes);
        Ok(Locator::new(format!("memory://{path}")))
    }
}

// ========================================
// PayloadSource
// ========================================

/// Payloads kept in memory, keyed by source reference.
#[derive(Debug, Default)]
pub struct InMemoryPayloadSource {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryPayloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        lock(&self.payloads).insert(source.into(), bytes.into());
    }

    /// Simulates the local file being cleaned up.
    pub fn remove(&self, source: &str) {
        lock(&self.payloads).remove(source);
    }
}

#[async_trait]
impl PayloadSource for InMemoryPayloadSource {
    async fn read(&self, source: &str) -> Result<Vec<u8>, UploadError> {
        lock(&self.payloads)
            .get(source)
            .cloned()
            .ok_or_else(|| UploadError::SourceUnavailable(format!("no payload at {source}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> PhotoRecord {
        let task = UploadTask::new(
            RecordId::new("p1"),
            OwnerId::new("site"),
            "/photos/p1.jpg",
            "projects/site/photos/p1.jpg",
        );
        PhotoRecord::pending(&task, Utc::now())
    }

    #[tokio::test]
    async fn record_store_tracks_status_history() {
        let store = InMemoryRecordStore::new();
        let r = record();
        store.create(r.clone()).await.unwrap();
        store
            .update(&r.owner_id, &r.id, RecordUpdate::syncing())
            .await
            .unwrap();
        store
            .update(&r.owner_id, &r.id, RecordUpdate::synced(Locator::new("u"), 0))
            .await
            .unwrap();

        let labels: Vec<_> = store
            .history(&r.owner_id, &r.id)
            .await
            .iter()
            .map(UploadStatus::label)
            .collect();
        assert_eq!(labels, vec!["pending", "syncing", "synced"]);
    }

    #[tokio::test]
    async fn record_store_update_of_unknown_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store
            .update(&OwnerId::new("site"), &RecordId::new("nope"), RecordUpdate::syncing())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn refused_state_only_blocks_that_state() {
        let store = InMemoryRecordStore::new();
        store.refuse_state("syncing");
        let r = record();
        store.create(r.clone()).await.unwrap();

        assert!(store.update(&r.owner_id, &r.id, RecordUpdate::syncing()).await.is_err());
        assert!(
            store
                .update(&r.owner_id, &r.id, RecordUpdate::pending("offline", 0))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn object_store_plays_scripted_failures_then_succeeds() {
        let store = InMemoryObjectStore::new();
        store.fail_next("a", [UploadError::Offline("down".into())]);

        assert!(store.put("a", b"x".to_vec()).await.is_err());
        let locator = store.put("a", b"x".to_vec()).await.unwrap();
        assert_eq!(locator.as_str(), "memory://a");
        assert_eq!(store.put_count("a"), 2);
        assert_eq!(store.get("a"), Some(b"x".to_vec()));
    }

    #[tokio::test]
    async fn missing_payload_is_source_unavailable() {
        let source = InMemoryPayloadSource::new();
        source.insert("/p.jpg", b"jpeg".to_vec());
        assert!(source.read("/p.jpg").await.is_ok());

        source.remove("/p.jpg");
        assert!(matches!(
            source.read("/p.jpg").await,
            Err(UploadError::SourceUnavailable(_))
        ));
    }
}
