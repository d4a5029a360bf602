//! TriggerScheduler - パスをいつ走らせるかを決める
//!
//! どのきっかけ（enqueue, ハートビート, フォアグラウンド, リトライタイマー,
//! 手動）も行き着く先は同じで、パスを一つ走らせるか、走行中なら何もしない。
//! 仕事が残ったパスの後に張る遅延リトライも、ここが一つだけ持つ。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::ports::LifecycleState;
use crate::queue::QueuePolicy;

use super::processor::QueueProcessor;
use super::status::PassReport;

/// パスを要求した理由（ログ専用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Enqueue,
    Heartbeat,
    Foreground,
    Retry,
    Startup,
    Manual,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Enqueue => "enqueue",
            Trigger::Heartbeat => "heartbeat",
            Trigger::Foreground => "foreground",
            Trigger::Retry => "retry",
            Trigger::Startup => "startup",
            Trigger::Manual => "manual",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    processor: Arc<QueueProcessor>,
    policy: QueuePolicy,
    retry: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Inner {
    fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    async fn run_pass(self: &Arc<Self>, trigger: Trigger) -> Option<PassReport> {
        debug!(%trigger, "pass requested");
        let report = self.processor.run_pass().await;
        match &report {
            // The running pass arms or cancels the retry when it ends.
            None => {}
            Some(report) if report.remaining > 0 => self.schedule_retry(),
            Some(_) => self.cancel_retry(),
        }
        report
    }

    /// リトライタイマーを張る（既にあれば何もしない）
    fn schedule_retry(self: &Arc<Self>) {
        if self.is_shut_down() {
            return;
        }
        let mut slot = lock(&self.retry);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let delay = self.policy.retry_delay();
        debug!(delay_ms = delay.as_millis() as u64, "retry scheduled");
        *slot = Some(spawn_retry(Arc::downgrade(self), delay));
    }

    fn cancel_retry(&self) {
        if let Some(handle) = lock(&self.retry).take() {
            debug!("retry cancelled");
            handle.abort();
        }
    }

    fn retry_scheduled(&self) -> bool {
        lock(&self.retry)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn spawn_retry(inner: Weak<Inner>, delay: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        // Free the slot first so the pass below can arm the next retry.
        lock(&inner.retry).take();
        inner.run_pass(Trigger::Retry).await;
    })
}

fn spawn_pass(inner: Arc<Inner>, trigger: Trigger) -> JoinHandle<Option<PassReport>> {
    tokio::spawn(async move { inner.run_pass(trigger).await })
}

async fn heartbeat_loop(inner: Weak<Inner>, period: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.run_pass(Trigger::Heartbeat).await;
            }
        }
    }
    debug!("heartbeat stopped");
}

async fn lifecycle_loop(
    inner: Weak<Inner>,
    mut events: broadcast::Receiver<LifecycleState>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let event = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            event = events.recv() => event,
        };
        let wake = match event {
            Ok(LifecycleState::Foreground) => true,
            Ok(state) => {
                debug!(?state, "lifecycle change ignored");
                false
            }
            // A foreground event may be among the lost ones.
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "lifecycle listener lagged");
                true
            }
            Err(RecvError::Closed) => break,
        };
        if wake {
            let Some(inner) = inner.upgrade() else { break };
            inner.run_pass(Trigger::Foreground).await;
        }
    }
    debug!("lifecycle listener stopped");
}

/// プロセッサを起こすタイマーとリスナーを持つ
///
/// clone は安価で、clone 同士は同じタイマーを共有する。
#[derive(Clone)]
pub struct TriggerScheduler {
    inner: Arc<Inner>,
}

impl TriggerScheduler {
    pub fn new(processor: Arc<QueueProcessor>, policy: QueuePolicy) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                processor,
                policy,
                retry: Mutex::new(None),
                started: AtomicBool::new(false),
                shutdown_tx,
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn processor(&self) -> &Arc<QueueProcessor> {
        &self.inner.processor
    }

    /// キューを読み込み、仕事があればパスを起動し、ハートビートと
    /// ライフサイクルのリスナーを仕掛ける。
    ///
    /// 効果があるのは最初の呼び出しだけ。
    pub async fn start(&self, lifecycle: Option<broadcast::Receiver<LifecycleState>>) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!("scheduler already started");
            return;
        }

        let pending = self.inner.processor.queue().load().await.len();
        info!(pending, "upload scheduler starting");
        if pending > 0 {
            self.trigger(Trigger::Startup);
        }

        let mut workers = Vec::with_capacity(2);
        workers.push(tokio::spawn(heartbeat_loop(
            Arc::downgrade(&self.inner),
            self.inner.policy.heartbeat_interval(),
            self.inner.shutdown_tx.subscribe(),
        )));
        if let Some(events) = lifecycle {
            workers.push(tokio::spawn(lifecycle_loop(
                Arc::downgrade(&self.inner),
                events,
                self.inner.shutdown_tx.subscribe(),
            )));
        }
        lock(&self.inner.workers).extend(workers);
    }

    /// バックグラウンドでパスを要求
    pub fn trigger(&self, trigger: Trigger) -> JoinHandle<Option<PassReport>> {
        spawn_pass(self.inner.clone(), trigger)
    }

    /// 呼び出し元のタスクでパスを走らせる。走行中なら `None`
    pub async fn run_now(&self, trigger: Trigger) -> Option<PassReport> {
        self.inner.run_pass(trigger).await
    }

    pub fn retry_scheduled(&self) -> bool {
        self.inner.retry_scheduled()
    }

    /// ハートビートとリスナーを止め、保留中のリトライを捨てる。
    /// 走行中のパスはそのまま終わる。
    pub async fn shutdown(&self) {
        // send_replace stores the flag even with no listener subscribed
        self.inner.shutdown_tx.send_replace(true);
        self.inner.cancel_retry();
        let workers: Vec<_> = lock(&self.inner.workers).drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }
        info!("upload scheduler stopped");
    }
}
