//! Domain model (ids, tasks, records, statuses, outcomes, decisions, errors).

pub mod classify;
pub mod decision;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod record;
pub mod status;
pub mod task;

pub use classify::{Classifier, DefaultClassifier};
pub use decision::{Decider, Decision, DefaultDecider};
pub use errors::{ErrorKind, UploadError};
pub use ids::{OwnerId, RecordId};
pub use outcome::{AttemptOutcome, OutcomeKind};
pub use record::{PhotoRecord, RecordUpdate, RecordView};
pub use status::{Locator, SyncBadge, UploadStatus};
pub use task::{UploadTask, photo_destination};
