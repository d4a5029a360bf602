//! shutter-core
//!
//! 撮影した写真のためのオフラインファーストなアップロードキュー
//!
//! # モジュール構成
//! - **domain**: タスク、レコード、アップロード状態機械、結果、分類、判定
//! - **ports**: 外部システムの抽象化（TaskStore, RecordStore, ObjectStore など）
//! - **queue**: 永続化されたタスクリストとポリシー
//! - **app**: RecordGateway, QueueProcessor, TriggerScheduler, UploadService, Builder
//! - **impls**: インメモリ・ファイルシステム・JSON ファイルのアダプタ
//! - **config**: JSON 設定
//! - **error**: クレート全体のエラー

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{BuildError, NewUpload, PassReport, QueueSnapshot, Trigger, UploadService, UploadServiceBuilder};
pub use config::{ConfigError, ShutterConfig};
pub use error::ShutterError;
pub use queue::QueuePolicy;
