//! IdGenerator port - ID 生成の抽象化
//!
//! 新しいレコード ID とオブジェクト名はクライアント側で生成します。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（時刻でソート可能、調整不要）

use crate::domain::ids::RecordId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はクライアント側で ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（サービスのタスク間で共有する）
pub trait IdGenerator: Send + Sync {
    /// 写真レコードの ID を生成（呼び出し側が指定しない場合）
    fn generate_record_id(&self) -> RecordId;

    /// 保存先パス用の一意なオブジェクト名を生成
    fn generate_object_name(&self) -> String;
}

/// `Clock` を使う ULID ジェネレータ
///
/// `FixedClock` を渡すとタイムスタンプ部分が固定される。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_record_id(&self) -> RecordId {
        RecordId::from(self.next_ulid())
    }

    fn generate_object_name(&self) -> String {
        self.next_ulid().to_string().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_record_id();
        let id2 = id_gen.generate_record_id();
        assert_ne!(id1, id2);

        let n1 = id_gen.generate_object_name();
        let n2 = id_gen.generate_object_name();
        assert_ne!(n1, n2);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_record_id();
        let id2 = id_gen.generate_record_id();
        assert_ne!(id1, id2);

        let u1: Ulid = id1.as_str().parse().unwrap();
        let u2: Ulid = id2.as_str().parse().unwrap();
        assert_eq!(u1.timestamp_ms(), u2.timestamp_ms());
        assert_eq!(u1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn object_names_are_lowercase() {
        let name = UlidGenerator::new(SystemClock).generate_object_name();
        assert_eq!(name.len(), 26);
        assert_eq!(name, name.to_lowercase());
    }
}
