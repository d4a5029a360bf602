//! TaskStore port - アップロードキューの永続化

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::UploadTask;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 保存済みリストをデコードできない。壊れたファイルは退避済み。
    #[error("task store at {path} is corrupt (moved to {quarantined}): {source}")]
    Corrupt {
        path: PathBuf,
        quarantined: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode task list: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

/// TaskStore は未完了アップロードの順序付きリストを永続化
///
/// # 契約
/// - `save_all` はリスト全体をアトミックに置き換える（クラッシュ後は旧リスト
///   か新リストのどちらか）
/// - `load` は古い順に返す。ストアが無ければ空
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self) -> Result<Vec<UploadTask>, StoreError>;

    async fn save_all(&self, tasks: &[UploadTask]) -> Result<(), StoreError>;
}
