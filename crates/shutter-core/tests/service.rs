mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use shutter_core::domain::{OwnerId, RecordId, UploadStatus};
use shutter_core::impls::{
    FsObjectStore, FsPayloadSource, InMemoryObjectStore, InMemoryPayloadSource, InMemoryRecordStore,
    InMemoryTaskStore, JsonFileRecordStore, JsonFileTaskStore,
};
use shutter_core::ports::{LifecycleState, ObjectStore, RecordStoreError, TaskStore};
use shutter_core::{NewUpload, ShutterConfig, UploadService, UploadServiceBuilder};

struct Ports {
    tasks: Arc<InMemoryTaskStore>,
    records: Arc<InMemoryRecordStore>,
    payloads: Arc<InMemoryPayloadSource>,
    objects: Arc<InMemoryObjectStore>,
}

fn service() -> (UploadService, Ports) {
    let ports = Ports {
        tasks: Arc::new(InMemoryTaskStore::new()),
        records: Arc::new(InMemoryRecordStore::new()),
        payloads: Arc::new(InMemoryPayloadSource::new()),
        objects: Arc::new(InMemoryObjectStore::new()),
    };
    let service = UploadServiceBuilder::new()
        .task_store(ports.tasks.clone())
        .record_store(ports.records.clone())
        .payload_source(ports.payloads.clone())
        .object_store(ports.objects.clone())
        .build()
        .unwrap();
    (service, ports)
}

fn owner() -> OwnerId {
    OwnerId::new(common::OWNER)
}

#[tokio::test]
async fn enqueue_creates_a_pending_record_and_queues_the_task() {
    let (service, ports) = service();
    ports.objects.set_offline(true);
    ports.payloads.insert("/photos/a.jpg", b"jpeg".to_vec());

    let task = service
        .enqueue(NewUpload::new(owner(), "/photos/a.jpg").with_record_id(RecordId::new("a")))
        .await
        .unwrap();

    assert_eq!(task.id.as_str(), "a");
    assert_eq!(task.attempts, 0);
    assert!(task.destination.starts_with("projects/site-1/photos/"));
    let record = ports.records.get(&task.owner_id, &task.id).await.unwrap();
    assert_eq!(record.path, task.destination);
    assert_eq!(record.upload_attempts, 0);

    // The triggered pass only defers it while the object store is offline.
    service.process_now().await;
    assert_eq!(ports.tasks.saved().await, vec![task.clone()]);
    assert_eq!(service.snapshot().await.tasks, vec![task]);
}

#[tokio::test]
async fn enqueued_photo_reaches_synced_through_process_now() {
    let (service, ports) = service();
    ports.payloads.insert("/photos/a.jpg", b"jpeg".to_vec());

    let task = service
        .enqueue(NewUpload::new(owner(), "/photos/a.jpg"))
        .await
        .unwrap();
    // The enqueue trigger may already have run; either way the queue drains.
    service.process_now().await;
    service.process_now().await;

    let record = ports.records.get(&task.owner_id, &task.id).await.unwrap();
    assert_eq!(record.status.label(), "synced");
    assert!(service.snapshot().await.is_empty());
    assert_eq!(ports.objects.get(&task.destination), Some(b"jpeg".to_vec()));
}

#[tokio::test]
async fn duplicate_enqueue_keeps_the_first_task() {
    let (service, ports) = service();
    ports.objects.set_offline(true);
    ports.payloads.insert("/photos/a.jpg", b"jpeg".to_vec());
    let request = NewUpload::new(owner(), "/photos/a.jpg").with_record_id(RecordId::new("a"));

    let first = service.enqueue(request.clone()).await.unwrap();
    service.process_now().await;
    let second = service.enqueue(request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(service.snapshot().await.len(), 1);
}

#[tokio::test]
async fn failed_record_create_queues_nothing() {
    let (service, ports) = service();
    ports.records.set_offline(true);

    let err = service
        .enqueue(NewUpload::new(owner(), "/photos/a.jpg"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecordStoreError::Unavailable(_)));
    assert!(service.snapshot().await.is_empty());
    assert_eq!(ports.tasks.save_count(), 0);
}

#[tokio::test]
async fn snapshot_reports_a_scheduled_retry() {
    let (service, ports) = service();
    ports.objects.set_offline(true);
    ports.payloads.insert("/photos/a.jpg", b"jpeg".to_vec());
    service
        .enqueue(NewUpload::new(owner(), "/photos/a.jpg"))
        .await
        .unwrap();

    service.process_now().await;
    service.process_now().await;

    let snapshot = service.snapshot().await;
    assert_eq!(snapshot.tasks.len(), 1);
    assert!(snapshot.retry_scheduled);
    assert!(!snapshot.processing);
    service.shutdown().await;
    assert!(!service.snapshot().await.retry_scheduled);
}

#[tokio::test]
async fn restart_resumes_the_persisted_queue() {
    let dir = tempfile::tempdir().unwrap();
    let config = ShutterConfig::in_dir(dir.path());
    let photo = dir.path().join("a.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    let build = |objects: Arc<dyn ObjectStore>| {
        UploadServiceBuilder::new()
            .task_store(Arc::new(JsonFileTaskStore::new(config.queue_file())))
            .record_store(Arc::new(JsonFileRecordStore::new(config.records_file())))
            .payload_source(Arc::new(FsPayloadSource))
            .object_store(objects)
            .policy(config.policy.clone())
            .build()
            .unwrap()
    };

    // First process: captured while offline, then killed.
    let offline = Arc::new(InMemoryObjectStore::new());
    offline.set_offline(true);
    let first = build(offline as Arc<dyn ObjectStore>);
    let owner = owner();
    let request = NewUpload::new(owner.clone(), photo.display().to_string()).with_record_id(RecordId::new("a"));
    let task = first.enqueue(request).await.unwrap();
    first.process_now().await;
    first.shutdown().await;
    drop(first);

    let queued = JsonFileTaskStore::new(config.queue_file()).load().await.unwrap();
    assert_eq!(queued, vec![task.clone()]);

    // Second process: back online; start() resumes the leftover task.
    let online: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&config.object_root));
    let second = build(online);
    let (tx, rx) = broadcast::channel(4);
    second.start(Some(rx)).await;
    tx.send(LifecycleState::Foreground).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    second.process_now().await;
    second.shutdown().await;

    let records = JsonFileRecordStore::new(config.records_file());
    let record = records.get(&owner, &task.id).await.unwrap().unwrap();
    assert!(matches!(record.status, UploadStatus::Synced { .. }));
    assert!(config.object_root.join(&task.destination).exists());
    assert!(second.snapshot().await.is_empty());
}

#[tokio::test]
async fn corrupt_queue_file_starts_empty_and_is_kept_aside() {
    let dir = tempfile::tempdir().unwrap();
    let config = ShutterConfig::in_dir(dir.path());
    std::fs::write(config.queue_file(), b"{ truncated").unwrap();

    let service = UploadServiceBuilder::new()
        .task_store(Arc::new(JsonFileTaskStore::new(config.queue_file())))
        .record_store(Arc::new(InMemoryRecordStore::new()))
        .payload_source(Arc::new(InMemoryPayloadSource::new()))
        .object_store(Arc::new(InMemoryObjectStore::new()))
        .build()
        .unwrap();

    assert!(service.snapshot().await.is_empty());
    assert!(dir.path().join("upload_queue.json.corrupt").exists());
}
