//! Crate-wide error type
//!
//! Each subsystem defines its own error enum; this module folds them into a
//! single [`Error`] so embedding code can use one `Result` alias.

use crate::domain::DomainError;
use crate::queue::QueueError;
use crate::rls::RlsError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug, Clone)]
pub enum Error {
    /// Notifier domain operation failed
    Domain(DomainError),
    /// Message queue operation failed
    Queue(QueueError),
    /// Resource list dispatcher operation failed
    Rls(RlsError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Domain(e) => write!(f, "Domain error: {}", e),
            Error::Queue(e) => write!(f, "Queue error: {}", e),
            Error::Rls(e) => write!(f, "RLS error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Domain(e) => Some(e),
            Error::Queue(e) => Some(e),
            Error::Rls(e) => Some(e),
        }
    }
}

impl From<DomainError> for Error {
    fn from(e: DomainError) -> Self {
        Error::Domain(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::Queue(e)
    }
}

impl From<RlsError> for Error {
    fn from(e: RlsError) -> Self {
        Error::Rls(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_source() {
        let err: Error = QueueError::EmptyPayload.into();
        assert_eq!(err.to_string(), "Queue error: Message payload is empty");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_domain_error() {
        let err: Error = DomainError::EmptyPackageName.into();
        assert!(matches!(err, Error::Domain(DomainError::EmptyPackageName)));
    }
}
