//! QueueProcessor - the single-flight attempt pass.
//!
//! # Flow
//! 1. Claim the running flag; if another pass holds it, return `None`.
//! 2. Walk the queue oldest first.
//! 3. Run one attempt per task on its own tokio task, so a panicking
//!    adapter becomes an `Internal` outcome instead of ending the pass.
//! 4. Ask the `Decider` what to do and carry it out on the queue and the
//!    record.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::domain::{
    AttemptOutcome, Classifier, Decider, Decision, DefaultClassifier, DefaultDecider, ErrorKind, Locator, UploadError,
    UploadTask,
};
use crate::ports::{ObjectStore, PayloadSource, RecordStore};
use crate::queue::{QueuePolicy, TaskQueue};

use super::gateway::RecordGateway;
use super::status::PassReport;

/// Holds the running flag for the length of a pass.
///
/// Dropping it clears the flag and wakes `wait_idle` callers, on every exit
/// path including unwinding.
struct PassGuard<'a> {
    running: &'a AtomicBool,
    idle: &'a Notify,
}

impl<'a> PassGuard<'a> {
    fn acquire(running: &'a AtomicBool, idle: &'a Notify) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running, idle })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

/// Everything one attempt touches. Cloned into the attempt's tokio task.
#[derive(Clone)]
struct Attempt {
    gateway: RecordGateway,
    payloads: Arc<dyn PayloadSource>,
    objects: Arc<dyn ObjectStore>,
    classifier: Arc<dyn Classifier>,
}

impl Attempt {
    async fn run(self, task: UploadTask) -> AttemptOutcome {
        self.gateway.begin_upload(&task).await;

        let bytes = match self.payloads.read(&task.source).await {
            Ok(bytes) => bytes,
            Err(err) => return AttemptOutcome::SourceUnavailable(err.to_string()),
        };

        match self.transfer(&task, bytes).await {
            Ok(locator) => AttemptOutcome::Uploaded(locator),
            Err(err) => match self.classifier.classify(&err) {
                ErrorKind::Transient => AttemptOutcome::Transient(err.to_string()),
                ErrorKind::Permanent => AttemptOutcome::Permanent(err.to_string()),
            },
        }
    }

    /// Object write followed by the `synced` record write. Either failing
    /// fails the attempt; the object write is repeated on the next one.
    async fn transfer(&self, task: &UploadTask, bytes: Vec<u8>) -> Result<Locator, UploadError> {
        let locator = self.objects.put(&task.destination, bytes).await?;
        self.gateway.complete_upload(task, locator.clone()).await?;
        Ok(locator)
    }
}

/// Drains the `TaskQueue`, one pass at a time.
pub struct QueueProcessor {
    queue: Arc<TaskQueue>,
    attempt: Attempt,
    decider: Arc<dyn Decider>,
    running: AtomicBool,
    idle: Notify,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<TaskQueue>,
        records: Arc<dyn RecordStore>,
        payloads: Arc<dyn PayloadSource>,
        objects: Arc<dyn ObjectStore>,
        policy: &QueuePolicy,
    ) -> Self {
        Self {
            queue,
            attempt: Attempt {
                gateway: RecordGateway::new(records),
                payloads,
                objects,
                classifier: Arc::new(DefaultClassifier),
            },
            decider: Arc::new(DefaultDecider::new(policy.max_attempts)),
            running: AtomicBool::new(false),
            idle: Notify::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.attempt.classifier = classifier;
        self
    }

    pub fn with_decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = decider;
        self
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Waits until no pass is running.
    pub async fn wait_idle(&self) {
        let notified = self.idle.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_running() {
            return;
        }
        notified.await;
    }

    /// Runs one pass over the queue.
    ///
    /// Returns `None` without touching anything if a pass is already running.
    pub async fn run_pass(&self) -> Option<PassReport> {
        let Some(_guard) = PassGuard::acquire(&self.running, &self.idle) else {
            debug!("pass already running; skipped");
            return None;
        };

        let mut report = PassReport::default();
        let mut index = 0;
        // New tasks appended during the pass are picked up at the tail.
        while let Some(task) = self.queue.get(index).await {
            if let Some(reason) = task.abandoned.clone() {
                let attempts = task.attempts;
                self.settle_dead(&mut index, &mut report, task, attempts, reason).await;
                continue;
            }
            let outcome = self.attempt_isolated(&task).await;
            match self.decider.decide(&task, &outcome) {
                Decision::Complete => {
                    info!(task_id = %task.id, owner_id = %task.owner_id, attempts = task.attempts, "upload synced");
                    self.queue.remove_at(index).await;
                    report.uploaded.push(task.id);
                }
                Decision::Retry { attempts, reason } => {
                    // Still queued; the next attempt rewrites the status.
                    let _ = self
                        .attempt
                        .gateway
                        .fail_upload(&task, &reason, attempts, false)
                        .await;
                    if attempts != task.attempts {
                        warn!(task_id = %task.id, attempts, reason = %reason, "upload failed; will retry");
                        self.queue.update_at(index, task.with_attempts(attempts)).await;
                        report.retrying.push(task.id);
                    } else {
                        debug!(task_id = %task.id, reason = %reason, "upload deferred");
                        report.deferred.push(task.id);
                    }
                    index += 1;
                }
                Decision::MarkDead { attempts, reason } => {
                    warn!(task_id = %task.id, owner_id = %task.owner_id, attempts, reason = %reason, "upload abandoned");
                    self.settle_dead(&mut index, &mut report, task, attempts, reason).await;
                }
            }
        }

        report.remaining = self.queue.len().await;
        debug!(
            uploaded = report.uploaded.len(),
            deferred = report.deferred.len(),
            retrying = report.retrying.len(),
            failed = report.failed.len(),
            unrecorded = report.unrecorded.len(),
            remaining = report.remaining,
            "pass finished"
        );
        Some(report)
    }

    /// Writes `error` on the record, then drops the task.
    ///
    /// If the write fails the task stays queued, marked abandoned, so a
    /// later pass repeats only the write.
    async fn settle_dead(
        &self,
        index: &mut usize,
        report: &mut PassReport,
        task: UploadTask,
        attempts: u32,
        reason: String,
    ) {
        match self.attempt.gateway.fail_upload(&task, &reason, attempts, true).await {
            Ok(()) => {
                self.queue.remove_at(*index).await;
                report.failed.push(task.id);
            }
            Err(_) => {
                if task.abandoned.as_deref() != Some(reason.as_str()) || task.attempts != attempts {
                    self.queue.update_at(*index, task.abandon(attempts, reason)).await;
                }
                report.unrecorded.push(task.id);
                *index += 1;
            }
        }
    }

    async fn attempt_isolated(&self, task: &UploadTask) -> AttemptOutcome {
        let attempt = self.attempt.clone().run(task.clone());
        match tokio::spawn(attempt).await {
            Ok(outcome) => outcome,
            Err(err) => AttemptOutcome::Internal(format!("upload attempt aborted: {err}")),
        }
    }
}
