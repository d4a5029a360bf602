//! UploadServiceBuilder - 起動時検証付きの組み立て
//!
//! デフォルトの無いポートはすべて必須です。`build()` は足りないものを
//! まとめて返します。

use std::sync::Arc;

use crate::config::ConfigError;
use crate::domain::{Classifier, Decider};
use crate::ports::{Clock, IdGenerator, ObjectStore, PayloadSource, RecordStore, SystemClock, TaskStore, UlidGenerator};
use crate::queue::{QueuePolicy, TaskQueue};

use super::processor::QueueProcessor;
use super::scheduler::TriggerScheduler;
use super::service::UploadService;

/// サービスを組み立てられない時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These ports must be set before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("invalid queue policy: {0}")]
    InvalidPolicy(#[source] ConfigError),
}

/// # Example
/// ```ignore
/// let service = UploadServiceBuilder::new()
///     .task_store(Arc::new(JsonFileTaskStore::new("queue.json")))
///     .record_store(records)
///     .payload_source(Arc::new(FsPayloadSource))
///     .object_store(Arc::new(FsObjectStore::new("objects")))
///     .build()?;
/// ```
#[derive(Default)]
pub struct UploadServiceBuilder {
    task_store: Option<Arc<dyn TaskStore>>,
    record_store: Option<Arc<dyn RecordStore>>,
    payload_source: Option<Arc<dyn PayloadSource>>,
    object_store: Option<Arc<dyn ObjectStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    classifier: Option<Arc<dyn Classifier>>,
    decider: Option<Arc<dyn Decider>>,
    policy: QueuePolicy,
}

impl UploadServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    pub fn payload_source(mut self, source: Arc<dyn PayloadSource>) -> Self {
        self.payload_source = Some(source);
        self
    }

    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// 省略時は `SystemClock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時は builder の clock を使う `UlidGenerator`
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// ポリシーから作る試行予算の Decider を差し替える
    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    pub fn policy(mut self, policy: QueuePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<UploadService, BuildError> {
        self.policy.validate().map_err(BuildError::InvalidPolicy)?;

        let mut missing = Vec::new();
        if self.task_store.is_none() {
            missing.push("task_store");
        }
        if self.record_store.is_none() {
            missing.push("record_store");
        }
        if self.payload_source.is_none() {
            missing.push("payload_source");
        }
        if self.object_store.is_none() {
            missing.push("object_store");
        }
        let (Some(task_store), Some(records), Some(payloads), Some(objects)) = (
            self.task_store,
            self.record_store,
            self.payload_source,
            self.object_store,
        ) else {
            return Err(BuildError::MissingComponents(missing));
        };

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        let queue = Arc::new(TaskQueue::new(task_store));
        let mut processor = QueueProcessor::new(queue.clone(), records.clone(), payloads, objects, &self.policy);
        if let Some(classifier) = self.classifier {
            processor = processor.with_classifier(classifier);
        }
        if let Some(decider) = self.decider {
            processor = processor.with_decider(decider);
        }
        let scheduler = TriggerScheduler::new(Arc::new(processor), self.policy);

        Ok(UploadService {
            queue,
            records,
            scheduler,
            ids,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OwnerId;
    use crate::impls::{InMemoryObjectStore, InMemoryPayloadSource, InMemoryRecordStore, InMemoryTaskStore};
    use crate::ports::FixedClock;
    use crate::app::NewUpload;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn complete() -> UploadServiceBuilder {
        UploadServiceBuilder::new()
            .task_store(Arc::new(InMemoryTaskStore::new()))
            .record_store(Arc::new(InMemoryRecordStore::new()))
            .payload_source(Arc::new(InMemoryPayloadSource::new()))
            .object_store(Arc::new(InMemoryObjectStore::new()))
    }

    #[test]
    fn build_success() {
        assert!(complete().build().is_ok());
    }

    #[test]
    fn build_lists_every_missing_port() {
        let result = UploadServiceBuilder::new()
            .record_store(Arc::new(InMemoryRecordStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingComponents(missing))
                if missing == vec!["task_store", "payload_source", "object_store"]
        ));
    }

    #[test]
    fn build_rejects_invalid_policy() {
        let result = complete()
            .policy(QueuePolicy {
                retry_delay_ms: 0,
                ..QueuePolicy::default()
            })
            .build();
        assert!(matches!(result, Err(BuildError::InvalidPolicy(_))));
    }

    #[tokio::test]
    async fn injected_clock_drives_generated_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let service = complete().clock(Arc::new(FixedClock::new(at))).build().unwrap();

        let task = service
            .enqueue(NewUpload::new(OwnerId::new("site"), "/photos/a.jpg"))
            .await
            .unwrap();

        let id: Ulid = task.id.as_str().parse().unwrap();
        assert_eq!(id.timestamp_ms(), at.timestamp_millis() as u64);
        assert!(task.destination.starts_with("projects/site/photos/"));
        assert!(task.destination.ends_with(".jpg"));
    }
}
