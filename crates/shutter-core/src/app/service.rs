//! UploadService - the facade the host application talks to.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::{OwnerId, PhotoRecord, RecordId, UploadTask, photo_destination};
use crate::ports::{Clock, IdGenerator, LifecycleState, RecordStore, RecordStoreError};
use crate::queue::{Appended, Durability, TaskQueue};

use super::scheduler::{Trigger, TriggerScheduler};
use super::status::{PassReport, QueueSnapshot};

/// A photo the host wants uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub owner_id: OwnerId,

    /// Local payload reference (path or `file://` URI).
    pub source: String,

    /// Id of an existing record; a new one is generated when absent.
    pub record_id: Option<RecordId>,
}

impl NewUpload {
    pub fn new(owner_id: OwnerId, source: impl Into<String>) -> Self {
        Self {
            owner_id,
            source: source.into(),
            record_id: None,
        }
    }

    pub fn with_record_id(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }
}

/// Wires the queue, the processor and the scheduler together.
///
/// Built by `UploadServiceBuilder`.
pub struct UploadService {
    pub(super) queue: Arc<TaskQueue>,
    pub(super) records: Arc<dyn RecordStore>,
    pub(super) scheduler: TriggerScheduler,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) clock: Arc<dyn Clock>,
}

impl UploadService {
    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn scheduler(&self) -> &TriggerScheduler {
        &self.scheduler
    }

    /// Creates the `pending` record, queues the upload and requests a pass.
    ///
    /// Enqueueing a record id that is already queued returns the queued
    /// task unchanged. A failed record create is returned and nothing is
    /// queued.
    pub async fn enqueue(&self, request: NewUpload) -> Result<UploadTask, RecordStoreError> {
        if let Some(id) = &request.record_id {
            if let Some(existing) = self.queue.find(id).await {
                debug!(task_id = %id, "upload already queued");
                return Ok(existing);
            }
        }

        let id = request
            .record_id
            .unwrap_or_else(|| self.ids.generate_record_id());
        let destination = photo_destination(&request.owner_id, &self.ids.generate_object_name());
        let task = UploadTask::new(id, request.owner_id, request.source, destination);

        self.records
            .create(PhotoRecord::pending(&task, self.clock.now()))
            .await?;

        match self.queue.append(task.clone()).await {
            Appended::Queued(durability) => {
                info!(
                    task_id = %task.id,
                    owner_id = %task.owner_id,
                    destination = %task.destination,
                    persisted = durability == Durability::Persisted,
                    "upload queued"
                );
            }
            // Lost a race with another enqueue of the same id.
            Appended::Duplicate => {
                if let Some(existing) = self.queue.find(&task.id).await {
                    return Ok(existing);
                }
            }
        }

        self.scheduler.trigger(Trigger::Enqueue);
        Ok(task)
    }

    /// Current queue contents and processor state.
    pub async fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tasks: self.queue.load().await,
            processing: self.scheduler.processor().is_running(),
            retry_scheduled: self.scheduler.retry_scheduled(),
        }
    }

    /// Runs a pass now ("sync now").
    ///
    /// If a pass is already running this waits for it to finish and returns
    /// `None`.
    pub async fn process_now(&self) -> Option<PassReport> {
        let report = self.scheduler.run_now(Trigger::Manual).await;
        if report.is_none() {
            self.scheduler.processor().wait_idle().await;
        }
        report
    }

    pub async fn start(&self, lifecycle: Option<broadcast::Receiver<LifecycleState>>) {
        self.scheduler.start(lifecycle).await;
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
