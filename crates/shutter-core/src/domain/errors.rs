//! Errors - 転送失敗とその分類

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ErrorKind は転送失敗のリトライ分類
///
/// - Transient: 接続系。予算を消費せずにリトライ
/// - Permanent: リトライしても直らない。予算を消費
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// 一件のアップロード（読み込み・転送・記録）での失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("network unavailable: {0}")]
    Offline(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("name resolution failed: {0}")]
    Dns(String),

    /// オブジェクトストア自身のリトライが尽きた
    #[error("object store retry limit exceeded")]
    RetryLimitExceeded,

    #[error("source payload unavailable: {0}")]
    SourceUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid destination path: {0}")]
    InvalidDestination(String),

    /// サービスコード付きのバックエンドエラー（例: `storage/unauthorized`）
    #[error("{code}: {message}")]
    Remote { code: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::Remote {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// リクエスト不正ではなく接続の問題を示すバックエンドコード
pub const TRANSIENT_REMOTE_CODES: &[&str] = &[
    "storage/retry-limit-exceeded",
    "storage/network-request-failed",
    "unavailable",
    "deadline-exceeded",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_render_code_and_message() {
        let err = UploadError::remote("storage/unauthorized", "no write access");
        assert_eq!(err.to_string(), "storage/unauthorized: no write access");
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let s = serde_json::to_string(&ErrorKind::Transient).unwrap();
        assert_eq!(s, "\"transient\"");
    }
}
