//! Classifier: decides whether a failure may consume the retry budget.
//!
//! This is the policy core of the queue. Transient failures assume
//! connectivity will come back and the same blob will eventually go through;
//! permanent failures must converge to a terminal state so no record stays
//! "pending" forever.

use super::errors::{ErrorKind, TRANSIENT_REMOTE_CODES, UploadError};

/// Trait for classifying transfer failures.
///
/// Classifiers are pure functions. Hosts with a different backend can plug
/// their own mapping of backend codes.
pub trait Classifier: Send + Sync {
    fn classify(&self, error: &UploadError) -> ErrorKind;
}

/// Default classifier.
///
/// Transient: no connectivity, DNS and timeout failures, the object store's
/// own retry-limit signal, and backend codes/messages that name the network.
/// Everything else is permanent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl Classifier for DefaultClassifier {
    fn classify(&self, error: &UploadError) -> ErrorKind {
        match error {
            UploadError::Offline(_)
            | UploadError::Timeout(_)
            | UploadError::Dns(_)
            | UploadError::RetryLimitExceeded => ErrorKind::Transient,
            UploadError::Remote { code, message } => {
                let network_code = TRANSIENT_REMOTE_CODES.contains(&code.as_str());
                if network_code || message.to_lowercase().contains("network") {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Permanent
                }
            }
            UploadError::SourceUnavailable(_)
            | UploadError::PermissionDenied(_)
            | UploadError::InvalidDestination(_)
            | UploadError::Internal(_) => ErrorKind::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::offline(UploadError::Offline("airplane mode".into()), ErrorKind::Transient)]
    #[case::timeout(UploadError::Timeout("30s".into()), ErrorKind::Transient)]
    #[case::dns(UploadError::Dns("storage.example".into()), ErrorKind::Transient)]
    #[case::retry_limit(UploadError::RetryLimitExceeded, ErrorKind::Transient)]
    #[case::retry_limit_code(UploadError::remote("storage/retry-limit-exceeded", "gave up"), ErrorKind::Transient)]
    #[case::network_code(UploadError::remote("storage/network-request-failed", "x"), ErrorKind::Transient)]
    #[case::network_message(UploadError::remote("storage/unknown", "Network request failed"), ErrorKind::Transient)]
    #[case::unauthorized(UploadError::remote("storage/unauthorized", "denied"), ErrorKind::Permanent)]
    #[case::missing_source(UploadError::SourceUnavailable("gone".into()), ErrorKind::Permanent)]
    #[case::permission(UploadError::PermissionDenied("bucket".into()), ErrorKind::Permanent)]
    #[case::bad_path(UploadError::InvalidDestination("../x".into()), ErrorKind::Permanent)]
    #[case::internal(UploadError::Internal("bug".into()), ErrorKind::Permanent)]
    fn default_classification(#[case] error: UploadError, #[case] expected: ErrorKind) {
        assert_eq!(DefaultClassifier.classify(&error), expected);
    }
}
