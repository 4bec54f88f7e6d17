//! Domain error types

use crate::queue::QueueError;

/// Error type for notifier domain operations
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Package name was empty
    EmptyPackageName,
    /// Record identifier was empty
    EmptyRecordId,
    /// Notifier is not registered in this domain
    NotifierNotFound(String),
    /// Subscription is not registered in this domain
    SubscriptionNotFound {
        /// Package the subscription claimed to belong to
        package: String,
        /// Watched record
        record_id: String,
    },
    /// Subscription was cleared and accepts no more notifications
    SubscriptionCleared,
    /// Destination queue rejected the notification
    Queue(QueueError),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::EmptyPackageName => write!(f, "Package name is empty"),
            DomainError::EmptyRecordId => write!(f, "Record id is empty"),
            DomainError::NotifierNotFound(package) => {
                write!(f, "Notifier not found in package: {}", package)
            }
            DomainError::SubscriptionNotFound { package, record_id } => {
                write!(f, "Subscription not found: {}/{}", package, record_id)
            }
            DomainError::SubscriptionCleared => write!(f, "Subscription no longer active"),
            DomainError::Queue(e) => write!(f, "Notification not queued: {}", e),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<QueueError> for DomainError {
    fn from(e: QueueError) -> Self {
        DomainError::Queue(e)
    }
}
