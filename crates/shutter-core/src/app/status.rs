//! Status - パスの結果と、現在のキューの様子

use serde::Serialize;

use crate::domain::{RecordId, UploadTask};

/// 一回の試行パスのまとめ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// アップロードして synced を記録
    pub uploaded: Vec<RecordId>,

    /// 一時的な失敗。試行回数は据え置き
    pub deferred: Vec<RecordId>,

    /// 予算の残る恒久的な失敗。試行回数を一つ増やして残す
    pub retrying: Vec<RecordId>,

    /// 諦めて error を記録
    pub failed: Vec<RecordId>,

    /// 諦めたが `error` をまだ書けていない。書けるまでキューに残す
    pub unrecorded: Vec<RecordId>,

    /// パス終了時に残っているタスク数
    pub remaining: usize,
}

impl PassReport {
    pub fn attempted(&self) -> usize {
        self.uploaded.len() + self.deferred.len() + self.retrying.len() + self.failed.len() + self.unrecorded.len()
    }

    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// ある時点のキューの様子（「同期キュー」画面）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub tasks: Vec<UploadTask>,

    /// パスが走行中
    pub processing: bool,

    /// 遅延リトライが張られている
    pub retry_scheduled: bool,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
