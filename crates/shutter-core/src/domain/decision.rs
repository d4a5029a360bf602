//! Decision model: what the queue does with a task after an attempt.
//!
//! This module defines the Decision type (what to do next) and the Decider
//! trait (how to get there from the task and the attempt outcome).

use super::outcome::AttemptOutcome;
use super::task::UploadTask;

/// The next action for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Uploaded and recorded; drop the task.
    Complete,

    /// Keep the task queued and report the record as pending.
    Retry { attempts: u32, reason: String },

    /// Give up: drop the task and report the record as failed.
    MarkDead { attempts: u32, reason: String },
}

impl Decision {
    /// Does this decision remove the task from the queue?
    pub fn is_final(&self) -> bool {
        matches!(self, Decision::Complete | Decision::MarkDead { .. })
    }
}

/// Trait for deciding the next action for a task.
///
/// Deciders are pure functions: given the task and the outcome of its latest
/// attempt they return the next action without side effects. The processor
/// carries the decision out.
pub trait Decider: Send + Sync {
    fn decide(&self, task: &UploadTask, outcome: &AttemptOutcome) -> Decision;
}

/// Attempt-budget decider.
///
/// - Transient failures keep the attempt count and retry.
/// - Permanent failures count; the task dies once `attempts >= max_attempts`.
/// - An unreadable source dies on first sight; the file will not reappear.
/// - Internal failures die with the budget marked as spent.
#[derive(Debug, Clone)]
pub struct DefaultDecider {
    max_attempts: u32,
}

impl DefaultDecider {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Decider for DefaultDecider {
    fn decide(&self, task: &UploadTask, outcome: &AttemptOutcome) -> Decision {
        match outcome {
            AttemptOutcome::Uploaded(_) => Decision::Complete,
            AttemptOutcome::Transient(reason) => Decision::Retry {
                attempts: task.attempts,
                reason: reason.clone(),
            },
            AttemptOutcome::SourceUnavailable(reason) => Decision::MarkDead {
                attempts: task.attempts + 1,
                reason: reason.clone(),
            },
            AttemptOutcome::Permanent(reason) => {
                let attempts = task.attempts + 1;
                if attempts >= self.max_attempts {
                    Decision::MarkDead {
                        attempts,
                        reason: reason.clone(),
                    }
                } else {
                    Decision::Retry {
                        attempts,
                        reason: reason.clone(),
                    }
                }
            }
            AttemptOutcome::Internal(reason) => Decision::MarkDead {
                attempts: self.max_attempts.max(task.attempts + 1),
                reason: reason.clone(),
            },
        }
    }
}
