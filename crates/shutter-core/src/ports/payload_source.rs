//! PayloadSource port - 端末上のバイナリ（撮影した写真）

use async_trait::async_trait;

use crate::domain::UploadError;

/// PayloadSource はタスクの `source` が指すバイト列を読む
///
/// どのバリアントを返しても、プロセッサは「ソースが読めない」として扱う。
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn read(&self, source: &str) -> Result<Vec<u8>, UploadError>;
}
