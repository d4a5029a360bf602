//! アップロード状態の状態機械（キューとリモートのレコードで共有）

use serde::{Deserialize, Serialize};
use std::fmt;

/// アップロード済みオブジェクトへの参照（通常はダウンロード URL）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 追跡中レコードのアップロード状態
///
/// 状態遷移:
/// - Pending -> Syncing -> Synced
/// - Pending -> Syncing -> Pending（一時的な失敗、または予算が残る恒久的な失敗）
/// - Pending -> Syncing -> Error（予算切れ、またはソースが読めない）
///
/// `Syncing` は目安。書けなかった場合は `Pending` から直接遷移することがある。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadStatus {
    /// 未試行、または回復しうる失敗の後で待機中
    Pending {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// 試行中
    Syncing,

    /// リモートに保存済み
    Synced { locator: Locator },

    /// 諦めた。`attempts` は判定時の試行回数
    Error { message: String, attempts: u32 },
}

impl UploadStatus {
    pub fn pending() -> Self {
        UploadStatus::Pending { message: None }
    }

    /// 状態のワイヤー上の名前
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Pending { .. } => "pending",
            UploadStatus::Syncing => "syncing",
            UploadStatus::Synced { .. } => "synced",
            UploadStatus::Error { .. } => "error",
        }
    }

    /// 終端状態か（キューがもう追跡しない）
    pub fn is_terminal(&self) -> bool {
        match self {
            UploadStatus::Synced { .. } | UploadStatus::Error { .. } => true,
            UploadStatus::Pending { .. } | UploadStatus::Syncing => false,
        }
    }

    /// 状態に付いたメッセージ
    pub fn message(&self) -> Option<&str> {
        match self {
            UploadStatus::Pending { message } => message.as_deref(),
            UploadStatus::Error { message, .. } => Some(message),
            UploadStatus::Syncing | UploadStatus::Synced { .. } => None,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the UI shows next to a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBadge {
    Error,
    /// Only the local document cache knows about it.
    Local,
    Waiting,
    Synced,
}

impl SyncBadge {
    /// Combines the upload status with the document store's cache flags.
    ///
    /// Order matters: an error always wins, then an unconfirmed local write
    /// served from cache, then anything still pending.
    pub fn derive(
        status: &UploadStatus,
        has_locator: bool,
        from_cache: bool,
        has_pending_writes: bool,
    ) -> Self {
        if let UploadStatus::Error { .. } = status {
            return SyncBadge::Error;
        }
        if from_cache && has_pending_writes {
            return SyncBadge::Local;
        }
        let in_progress = match status {
            UploadStatus::Pending { .. } | UploadStatus::Syncing => true,
            UploadStatus::Synced { .. } | UploadStatus::Error { .. } => false,
        };
        if in_progress || !has_locator || has_pending_writes {
            return SyncBadge::Waiting;
        }
        if from_cache {
            return SyncBadge::Local;
        }
        SyncBadge::Synced
    }
}
