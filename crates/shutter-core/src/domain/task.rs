use serde::{Deserialize, Serialize};

use super::ids::{OwnerId, RecordId};

/// 未完了のバイナリ転送一件と、リトライに必要な情報
///
/// `id` と `destination` は作成後に変わらない。どの試行も同じオブジェクトを
/// 上書きするので、クラッシュ後の再アップロードは無害。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: RecordId,
    pub owner_id: OwnerId,

    /// 端末上のペイロード（ファイルパスまたは `file://` URI）
    pub source: String,

    /// オブジェクトストアのキー。enqueue 時に一度だけ決める
    pub destination: String,

    /// これまでの恒久的な失敗の回数（一時的な失敗は数えない）
    #[serde(default)]
    pub attempts: u32,

    /// 諦めたが `error` 状態をまだレコードに書けていない時の理由。
    /// このタスクはもう試行しない。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abandoned: Option<String>,
}

impl UploadTask {
    pub fn new(
        id: RecordId,
        owner_id: OwnerId,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            source: source.into(),
            destination: destination.into(),
            attempts: 0,
            abandoned: None,
        }
    }

    /// Same task with a different attempt count.
    pub fn with_attempts(&self, attempts: u32) -> Self {
        Self {
            attempts,
            ..self.clone()
        }
    }

    /// Same task, given up for `reason` after `attempts`.
    pub fn abandon(&self, attempts: u32, reason: impl Into<String>) -> Self {
        Self {
            attempts,
            abandoned: Some(reason.into()),
            ..self.clone()
        }
    }
}

/// Object store key for a photo: `projects/{owner}/photos/{name}.jpg`.
pub fn photo_destination(owner_id: &OwnerId, name: &str) -> String {
    format!("projects/{owner_id}/photos/{name}.jpg")
}
