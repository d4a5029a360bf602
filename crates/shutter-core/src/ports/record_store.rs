//! RecordStore port - 写真レコードを持つドキュメントストア

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{OwnerId, PhotoRecord, RecordId, RecordUpdate, UploadError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordStoreError {
    /// 今はストアに届かない
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record {owner_id}/{id} not found")]
    NotFound { owner_id: OwnerId, id: RecordId },

    #[error("record store rejected the write: {0}")]
    Rejected(String),
}

/// アップロード中のレコード書き込み失敗も転送失敗と同じく分類する
/// （届かないストアは接続系）
impl From<RecordStoreError> for UploadError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::Unavailable(msg) => UploadError::Offline(msg),
            RecordStoreError::NotFound { .. } => UploadError::remote("record/not-found", err.to_string()),
            RecordStoreError::Rejected(msg) => UploadError::remote("record/rejected", msg),
        }
    }
}

/// RecordStore はキューが使うドキュメントストアの機能
///
/// # 契約
/// - `create` は新しいレコードを保存する（キューは `pending` で作る）
/// - `update` は既存レコードを更新する。レコードは owner の下にある
///   （`projects/{owner}/photos/{id}`）
/// - 購読やキャッシュフラグは UI 層の責務
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: PhotoRecord) -> Result<(), RecordStoreError>;

    async fn update(
        &self,
        owner_id: &OwnerId,
        id: &RecordId,
        update: RecordUpdate,
    ) -> Result<(), RecordStoreError>;
}
