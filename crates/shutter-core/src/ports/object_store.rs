//! ObjectStore port - リモートのバイナリ保存先

use async_trait::async_trait;

use crate::domain::{Locator, UploadError};

/// ObjectStore はパスにバイナリを保存し、取得用の locator を返す
///
/// # 契約
/// - `put` は `path` の既存オブジェクトを上書きする（再アップロードは冪等）
/// - 接続系の失敗は一時的な `UploadError` のバリアントで返す
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<Locator, UploadError>;
}
