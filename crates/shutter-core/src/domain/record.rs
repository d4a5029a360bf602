//! Photo record: the externally visible counterpart of an upload task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OwnerId, RecordId};
use super::status::{Locator, SyncBadge, UploadStatus};
use super::task::UploadTask;

/// A photo document as the document store holds it.
///
/// Design:
/// - The record outlives the queue entry; it keeps its final status.
/// - All mutations go through `apply`, so the status and the attempt
///   counter cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: RecordId,
    pub owner_id: OwnerId,

    /// Object store key the photo is (or will be) stored at.
    pub path: String,

    pub status: UploadStatus,

    /// Attempt count last reported by the queue.
    #[serde(default)]
    pub upload_attempts: u32,

    pub created_at: DateTime<Utc>,
}

impl PhotoRecord {
    /// Record for a freshly enqueued task.
    pub fn pending(task: &UploadTask, created_at: DateTime<Utc>) -> Self {
        Self {
            id: task.id.clone(),
            owner_id: task.owner_id.clone(),
            path: task.destination.clone(),
            status: UploadStatus::pending(),
            upload_attempts: task.attempts,
            created_at,
        }
    }

    /// Final download locator, once synced.
    pub fn url(&self) -> Option<&Locator> {
        match &self.status {
            UploadStatus::Synced { locator } => Some(locator),
            _ => None,
        }
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.status.message()
    }

    pub fn apply(&mut self, update: &RecordUpdate) {
        self.status = update.status.clone();
        if let Some(attempts) = update.attempts {
            self.upload_attempts = attempts;
        }
    }
}

/// Field update the gateway sends to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub status: UploadStatus,

    /// `None` leaves the stored attempt count untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl RecordUpdate {
    pub fn syncing() -> Self {
        Self {
            status: UploadStatus::Syncing,
            attempts: None,
        }
    }

    pub fn synced(locator: Locator, attempts: u32) -> Self {
        Self {
            status: UploadStatus::Synced { locator },
            attempts: Some(attempts),
        }
    }

    pub fn pending(message: impl Into<String>, attempts: u32) -> Self {
        Self {
            status: UploadStatus::Pending {
                message: Some(message.into()),
            },
            attempts: Some(attempts),
        }
    }

    pub fn error(message: impl Into<String>, attempts: u32) -> Self {
        Self {
            status: UploadStatus::Error {
                message: message.into(),
                attempts,
            },
            attempts: Some(attempts),
        }
    }
}

/// A record as seen through a document store subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub record: PhotoRecord,
    pub from_cache: bool,
    pub has_pending_writes: bool,
}

impl RecordView {
    pub fn badge(&self) -> SyncBadge {
        SyncBadge::derive(
            &self.record.status,
            self.record.url().is_some(),
            self.from_cache,
            self.has_pending_writes,
        )
    }
}
