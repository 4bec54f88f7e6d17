//! RLS error types

use crate::domain::DomainError;

/// Error type for resource list dispatcher operations
#[derive(Debug, Clone)]
pub enum RlsError {
    /// Subscriber is not allowed to watch the list
    Rejected {
        /// Subscriber URI
        subscriber: String,
        /// Resource list URI
        list_uri: String,
    },
    /// Resource list had no members
    EmptyResourceList(String),
    /// No subscription with this id
    SubscriptionNotFound(u64),
    /// Notification could not be delivered to the subscriber
    DeliveryFailed(String),
    /// Underlying domain operation failed
    Domain(DomainError),
}

impl std::fmt::Display for RlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RlsError::Rejected {
                subscriber,
                list_uri,
            } => write!(f, "Subscription of {} to {} rejected", subscriber, list_uri),
            RlsError::EmptyResourceList(list) => write!(f, "Resource list is empty: {}", list),
            RlsError::SubscriptionNotFound(id) => write!(f, "Subscription not found: {}", id),
            RlsError::DeliveryFailed(reason) => write!(f, "Delivery failed: {}", reason),
            RlsError::Domain(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RlsError {}

impl From<DomainError> for RlsError {
    fn from(e: DomainError) -> Self {
        RlsError::Domain(e)
    }
}
