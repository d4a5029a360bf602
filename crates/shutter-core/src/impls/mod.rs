//! Impls - ポートの実装
//!
//! # 含まれるもの
//! - **memory**: インメモリ実装（テスト・ドライラン用）
//! - **fs**: ローカルディスク上の写真と、ディレクトリを使うオブジェクトストア
//! - **json_file**: タスクリストとレコードを JSON ファイルに永続化

pub mod fs;
pub mod json_file;
pub mod memory;

pub use self::fs::{FsObjectStore, FsPayloadSource};
pub use self::json_file::{JsonFileRecordStore, JsonFileTaskStore};
pub use self::memory::{InMemoryObjectStore, InMemoryPayloadSource, InMemoryRecordStore, InMemoryTaskStore};
