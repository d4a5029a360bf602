//! Lifecycle - ホストアプリのライフサイクル通知
//!
//! ホストが `tokio::sync::broadcast::Sender<LifecycleState>` を持ち、
//! 起動時に receiver を一つスケジューラに渡します。

use serde::{Deserialize, Serialize};

/// アプリのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// アプリが前面に戻った。キューを起こす。
    Foreground,
    Background,
    Suspended,
}
