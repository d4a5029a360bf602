#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use shutter_core::app::QueueProcessor;
use shutter_core::domain::{Locator, OwnerId, PhotoRecord, RecordId, UploadError, UploadStatus, UploadTask};
use shutter_core::impls::{InMemoryObjectStore, InMemoryPayloadSource, InMemoryRecordStore, InMemoryTaskStore};
use shutter_core::ports::{ObjectStore, RecordStore};
use shutter_core::queue::{QueuePolicy, TaskQueue};

pub const OWNER: &str = "site-1";

pub fn task(id: &str) -> UploadTask {
    let owner = OwnerId::new(OWNER);
    UploadTask::new(
        RecordId::new(id),
        owner.clone(),
        format!("/photos/{id}.jpg"),
        format!("projects/{owner}/photos/{id}.jpg"),
    )
}

/// In-memory ports around one queue, wired straight into a processor.
pub struct Harness {
    pub tasks: Arc<InMemoryTaskStore>,
    pub records: Arc<InMemoryRecordStore>,
    pub payloads: Arc<InMemoryPayloadSource>,
    pub objects: Arc<InMemoryObjectStore>,
    pub queue: Arc<TaskQueue>,
    pub policy: QueuePolicy,
}

impl Harness {
    pub fn new() -> Self {
        let tasks = Arc::new(InMemoryTaskStore::new());
        Self {
            queue: Arc::new(TaskQueue::new(tasks.clone())),
            tasks,
            records: Arc::new(InMemoryRecordStore::new()),
            payloads: Arc::new(InMemoryPayloadSource::new()),
            objects: Arc::new(InMemoryObjectStore::new()),
            policy: QueuePolicy::default(),
        }
    }

    pub fn processor(&self) -> QueueProcessor {
        self.processor_with(self.objects.clone())
    }

    pub fn processor_with(&self, objects: Arc<dyn ObjectStore>) -> QueueProcessor {
        QueueProcessor::new(
            self.queue.clone(),
            self.records.clone(),
            self.payloads.clone(),
            objects,
            &self.policy,
        )
    }

    /// Creates the pending record, stores a payload and queues the task.
    pub async fn enqueue(&self, id: &str) -> UploadTask {
        let task = task(id);
        self.payloads.insert(task.source.clone(), format!("jpeg:{id}").into_bytes());
        self.records
            .create(PhotoRecord::pending(&task, Utc::now()))
            .await
            .unwrap();
        self.queue.append(task.clone()).await;
        task
    }

    pub async fn record(&self, task: &UploadTask) -> PhotoRecord {
        self.records.get(&task.owner_id, &task.id).await.unwrap()
    }

    pub async fn labels(&self, task: &UploadTask) -> Vec<&'static str> {
        self.records
            .history(&task.owner_id, &task.id)
            .await
            .iter()
            .map(UploadStatus::label)
            .collect()
    }

    pub async fn queued_ids(&self) -> Vec<String> {
        self.queue
            .load()
            .await
            .into_iter()
            .map(|t| t.id.as_str().to_string())
            .collect()
    }
}

/// Object store that remembers the order of successful puts.
pub struct RecordingObjectStore {
    inner: Arc<InMemoryObjectStore>,
    order: Mutex<Vec<String>>,
}

impl RecordingObjectStore {
    pub fn new(inner: Arc<InMemoryObjectStore>) -> Self {
        Self {
            inner,
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Locator, UploadError> {
        let locator = self.inner.put(path, bytes).await?;
        self.order.lock().unwrap().push(path.to_string());
        Ok(locator)
    }
}

/// Object store whose puts block until the test releases a permit.
///
/// Tracks how many puts are in flight at once.
pub struct GatedObjectStore {
    inner: Arc<InMemoryObjectStore>,
    gate: Arc<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    entered: AtomicUsize,
}

impl GatedObjectStore {
    pub fn new(inner: Arc<InMemoryObjectStore>) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            entered: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for GatedObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Locator, UploadError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| UploadError::Internal(e.to_string()))?;
        permit.forget();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.put(path, bytes).await
    }
}
