//! Ports - 抽象化レイヤー
//!
//! 外部システムはすべてここの trait 越しに扱います。
//!
//! - **TaskStore**: キューの永続化
//! - **RecordStore**: 写真レコードを持つドキュメントストア
//! - **ObjectStore**: バイナリの保存先
//! - **PayloadSource**: 端末上の写真
//! - **Clock** / **IdGenerator**: 時刻と ID
//! - **LifecycleState**: アプリのライフサイクル

pub mod clock;
pub mod id_generator;
pub mod lifecycle;
pub mod object_store;
pub mod payload_source;
pub mod record_store;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::lifecycle::LifecycleState;
pub use self::object_store::ObjectStore;
pub use self::payload_source::PayloadSource;
pub use self::record_store::{RecordStore, RecordStoreError};
pub use self::task_store::{StoreError, TaskStore};
