//! Outcome model: what happened during one upload attempt.
//!
//! This module does not decide anything. It only records the shape of the
//! result so the decider can turn it into a queue action.

use serde::{Deserialize, Serialize};

use super::status::Locator;

/// Failure taxonomy of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Uploaded,
    /// Connectivity-class failure; free retry.
    Transient,
    /// The local payload could not be read. Always terminal.
    SourceUnavailable,
    /// Any other failure during transfer or bookkeeping; consumes budget.
    Permanent,
    /// The attempt itself broke (e.g. a panicking adapter).
    Internal,
}

/// Result of one attempt at one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Uploaded(Locator),
    Transient(String),
    SourceUnavailable(String),
    Permanent(String),
    Internal(String),
}

impl AttemptOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AttemptOutcome::Uploaded(_) => OutcomeKind::Uploaded,
            AttemptOutcome::Transient(_) => OutcomeKind::Transient,
            AttemptOutcome::SourceUnavailable(_) => OutcomeKind::SourceUnavailable,
            AttemptOutcome::Permanent(_) => OutcomeKind::Permanent,
            AttemptOutcome::Internal(_) => OutcomeKind::Internal,
        }
    }

    /// Failure message, `None` on success.
    pub fn message(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Uploaded(_) => None,
            AttemptOutcome::Transient(m)
            | AttemptOutcome::SourceUnavailable(m)
            | AttemptOutcome::Permanent(m)
            | AttemptOutcome::Internal(m) => Some(m),
        }
    }
}
