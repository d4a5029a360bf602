use thiserror::Error;

use crate::app::BuildError;
use crate::config::ConfigError;
use crate::ports::{RecordStoreError, StoreError};

/// Top-level error for callers that drive the service as a whole.
#[derive(Debug, Error)]
pub enum ShutterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordStoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
