//! App - アプリケーションロジック
//!
//! # コンポーネント
//! - **gateway**: リモートのレコードへの状態書き込み
//! - **processor**: 同時に一つだけ走る試行パス
//! - **scheduler**: トリガー、ハートビート、遅延リトライ
//! - **service**: ファサード（enqueue, snapshot, process now, start）
//! - **builder**: 起動時検証付きの組み立て
//! - **status**: パスのレポートとキューのスナップショット

pub mod builder;
pub mod gateway;
pub mod processor;
pub mod scheduler;
pub mod service;
pub mod status;

pub use self::builder::{BuildError, UploadServiceBuilder};
pub use self::gateway::RecordGateway;
pub use self::processor::QueueProcessor;
pub use self::scheduler::{Trigger, TriggerScheduler};
pub use self::service::{NewUpload, UploadService};
pub use self::status::{PassReport, QueueSnapshot};
