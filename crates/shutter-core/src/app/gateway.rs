//! RecordGateway - status bookkeeping on the remote record.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Locator, RecordUpdate, UploadTask};
use crate::ports::{RecordStore, RecordStoreError};

/// Writes the record side of each upload attempt.
///
/// `begin_upload` is a status hint and never fails. The other writes return
/// their error so the caller can keep the task queued until the record
/// shows the outcome.
#[derive(Clone)]
pub struct RecordGateway {
    records: Arc<dyn RecordStore>,
}

impl RecordGateway {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Marks the record `syncing`. Failures are logged and ignored.
    pub async fn begin_upload(&self, task: &UploadTask) {
        if let Err(err) = self
            .records
            .update(&task.owner_id, &task.id, RecordUpdate::syncing())
            .await
        {
            debug!(task_id = %task.id, error = %err, "could not mark record syncing");
        }
    }

    /// Marks the record `synced` with its locator.
    pub async fn complete_upload(&self, task: &UploadTask, locator: Locator) -> Result<(), RecordStoreError> {
        self.records
            .update(
                &task.owner_id,
                &task.id,
                RecordUpdate::synced(locator, task.attempts),
            )
            .await
    }

    /// Reports a failed attempt: `error` when `terminal`, else `pending`.
    pub async fn fail_upload(
        &self,
        task: &UploadTask,
        message: &str,
        attempts: u32,
        terminal: bool,
    ) -> Result<(), RecordStoreError> {
        let update = if terminal {
            RecordUpdate::error(message, attempts)
        } else {
            RecordUpdate::pending(message, attempts)
        };
        let state = update.status.label();
        self.records
            .update(&task.owner_id, &task.id, update)
            .await
            .inspect_err(|err| warn!(task_id = %task.id, state, error = %err, "could not report upload failure on record"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, PhotoRecord, RecordId, UploadStatus};
    use crate::impls::InMemoryRecordStore;
    use chrono::Utc;

    async fn setup() -> (Arc<InMemoryRecordStore>, RecordGateway, UploadTask) {
        let store = Arc::new(InMemoryRecordStore::new());
        let task = UploadTask::new(
            RecordId::new("p1"),
            OwnerId::new("site"),
            "/photos/p1.jpg",
            "projects/site/photos/p1.jpg",
        );
        store.create(PhotoRecord::pending(&task, Utc::now())).await.unwrap();
        (store.clone(), RecordGateway::new(store), task)
    }

    #[tokio::test]
    async fn begin_failure_is_swallowed() {
        let (store, gateway, task) = setup().await;
        store.set_offline(true);
        gateway.begin_upload(&task).await;

        store.set_offline(false);
        let record = store.get(&task.owner_id, &task.id).await.unwrap();
        assert_eq!(record.status, UploadStatus::pending());
    }

    #[tokio::test]
    async fn complete_failure_is_reported() {
        let (store, gateway, task) = setup().await;
        store.set_offline(true);
        let err = gateway
            .complete_upload(&task, Locator::new("memory://x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn fail_upload_picks_state_by_finality() {
        let (store, gateway, task) = setup().await;

        gateway.fail_upload(&task, "offline", 0, false).await.unwrap();
        let record = store.get(&task.owner_id, &task.id).await.unwrap();
        assert_eq!(record.upload_error(), Some("offline"));
        assert_eq!(record.status.label(), "pending");

        gateway.fail_upload(&task, "denied", 3, true).await.unwrap();
        let record = store.get(&task.owner_id, &task.id).await.unwrap();
        assert_eq!(
            record.status,
            UploadStatus::Error {
                message: "denied".into(),
                attempts: 3
            }
        );
        assert_eq!(record.upload_attempts, 3);
    }

    #[tokio::test]
    async fn terminal_failure_write_is_reported() {
        let (store, gateway, task) = setup().await;
        store.refuse_state("error");

        assert!(gateway.fail_upload(&task, "denied", 3, true).await.is_err());
        assert!(gateway.fail_upload(&task, "offline", 0, false).await.is_ok());
    }
}
