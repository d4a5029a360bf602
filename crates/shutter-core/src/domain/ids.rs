//! Domain identifiers（型安全な ID）
//!
//! レコード ID はドキュメントストアのもので、キューとも共有するため中身は
//! 不透明な文字列です。Phantom Type パターンで実装を一つにまとめつつ、
//! OwnerId を RecordId の位置に渡すとコンパイルエラーになります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// ID の種類ごとのマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// ログやエラーメッセージで使う短い名前（"record", "owner"）
    fn kind() -> &'static str;
}

/// 文字列ベースの汎用 ID
///
/// シリアライズ時は素の文字列になる（同じストアの他クライアントからも読める）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::new(ulid.to_string())
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ========================================
// Marker types
// ========================================

/// 写真レコード用マーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Record {}

impl IdMarker for Record {
    fn kind() -> &'static str {
        "record"
    }
}

/// レコードを持つ親エンティティ（プロジェクト）用マーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {}

impl IdMarker for Owner {
    fn kind() -> &'static str {
        "owner"
    }
}

/// 写真レコードの ID（未完了アップロードの識別子も兼ねる）
pub type RecordId = Id<Record>;

/// レコードが属するプロジェクトの ID
pub type OwnerId = Id<Owner>;
