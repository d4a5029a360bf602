//! Persistent upload queue: the in-memory task list plus its durable store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{RecordId, UploadTask};
use crate::ports::{StoreError, TaskStore};

/// Whether a mutation reached the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    Persisted,
    /// Kept in memory only; lost on restart. Accepted degraded mode.
    MemoryOnly,
}

/// Result of `TaskQueue::append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Queued(Durability),
    /// A task with the same id is already queued; nothing changed.
    Duplicate,
}

struct QueueState {
    tasks: Vec<UploadTask>,
    loaded: bool,
}

/// Ordered list of pending uploads, oldest first.
///
/// Design:
/// - Loaded lazily from the `TaskStore` once per process lifetime.
/// - Every structural change is saved before the call returns, under the
///   same lock, so writes to the store never interleave.
/// - A failed save keeps the in-memory change and reports `MemoryOnly`.
/// - Until a load succeeds nothing is saved: the store may still hold tasks
///   this process has not seen. Each call retries the load and merges what
///   it finds ahead of the tasks added meanwhile.
pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    state: Mutex<QueueState>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            state: Mutex::new(QueueState {
                tasks: Vec::new(),
                loaded: false,
            }),
        }
    }

    async fn ensure_loaded(&self, state: &mut QueueState) {
        if state.loaded {
            return;
        }
        match self.store.load().await {
            Ok(mut tasks) => {
                debug!(count = tasks.len(), added = state.tasks.len(), "upload queue loaded");
                let added = std::mem::take(&mut state.tasks);
                for task in added {
                    if !tasks.iter().any(|t| t.id == task.id) {
                        tasks.push(task);
                    }
                }
                state.tasks = tasks;
                state.loaded = true;
            }
            // The bad file is already moved aside; nothing left to lose.
            Err(err @ StoreError::Corrupt { .. }) => {
                warn!(error = %err, "upload queue is corrupt; starting empty");
                state.loaded = true;
            }
            Err(err) => {
                warn!(error = %err, "upload queue could not be loaded; holding changes in memory");
            }
        }
    }

    async fn persist(&self, state: &QueueState) -> Durability {
        if !state.loaded {
            return Durability::MemoryOnly;
        }
        match self.store.save_all(&state.tasks).await {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                warn!(error = %err, "upload queue not persisted; change kept in memory");
                Durability::MemoryOnly
            }
        }
    }

    /// Loads the list if needed and returns a copy of it.
    pub async fn load(&self) -> Vec<UploadTask> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        state.tasks.clone()
    }

    /// Appends a task at the back of the queue.
    ///
    /// A task whose id is already queued is ignored: the queued entry keeps
    /// its destination and attempt count.
    pub async fn append(&self, task: UploadTask) -> Appended {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        if state.tasks.iter().any(|t| t.id == task.id) {
            debug!(task_id = %task.id, "task already queued");
            return Appended::Duplicate;
        }
        state.tasks.push(task);
        Appended::Queued(self.persist(&state).await)
    }

    /// Removes the task at `index`.
    pub async fn remove_at(&self, index: usize) -> Option<(UploadTask, Durability)> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        if index >= state.tasks.len() {
            return None;
        }
        let task = state.tasks.remove(index);
        let durability = self.persist(&state).await;
        Some((task, durability))
    }

    /// Replaces the task at `index` (used to record a consumed attempt).
    pub async fn update_at(&self, index: usize, task: UploadTask) -> Option<Durability> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        let slot = state.tasks.get_mut(index)?;
        *slot = task;
        Some(self.persist(&state).await)
    }

    /// Replaces the whole list and saves it.
    ///
    /// Unlike the other mutations this propagates the store error; the
    /// in-memory list is replaced either way.
    pub async fn save_all(&self, tasks: Vec<UploadTask>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.loaded = true;
        state.tasks = tasks;
        self.store.save_all(&state.tasks).await
    }

    /// Saves the current list, propagating the store error.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        if !state.loaded {
            return Err(StoreError::Unavailable("upload queue not loaded yet".into()));
        }
        self.store.save_all(&state.tasks).await
    }

    pub async fn get(&self, index: usize) -> Option<UploadTask> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        state.tasks.get(index).cloned()
    }

    pub async fn find(&self, id: &RecordId) -> Option<UploadTask> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        state.tasks.iter().find(|t| &t.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;
        state.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
