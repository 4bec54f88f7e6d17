//! Callbacks from the dispatcher to the SIP layer

use std::time::Duration;

use bytes::Bytes;

use crate::domain::SubscriptionStatus;

use super::error::RlsError;

/// Outcome of authorizing a list subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// Subscription is accepted and state is delivered
    Allowed,
    /// Subscription is kept but reported as pending
    Pending,
    /// Subscription is refused
    Rejected,
}

/// State of one list member as carried in a notification
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// Resource URI
    pub uri: String,
    /// Latest status reported for the resource
    pub status: SubscriptionStatus,
    /// Content type of `body`
    pub content_type: Option<String>,
    /// Latest document, if any arrived yet
    pub body: Option<Bytes>,
    /// Whether the resource changed since the previous notification
    pub changed: bool,
}

/// Aggregated notification for one list subscription
#[derive(Debug, Clone)]
pub struct RlsNotification {
    /// Dispatcher-assigned subscription id
    pub subscription_id: u64,
    /// Subscriber URI
    pub subscriber: String,
    /// Resource list URI
    pub list_uri: String,
    /// Event package
    pub package: String,
    /// Status of the list subscription
    pub status: SubscriptionStatus,
    /// Monotonic version, incremented per notification
    pub version: u32,
    /// Remaining lifetime
    pub expires_in: Duration,
    /// Every list member, changed or not
    pub resources: Vec<ResourceState>,
}

impl RlsNotification {
    /// Members that changed since the previous notification
    pub fn changed_resources(&self) -> impl Iterator<Item = &ResourceState> {
        self.resources.iter().filter(|r| r.changed)
    }
}

/// Handler for dispatcher events
///
/// Methods run while the dispatcher lock is held and should hand work off
/// rather than block.
pub trait RlsHandler: Send + Sync + 'static {
    /// Emit a notification to the subscriber
    fn send_notify(&self, notification: &RlsNotification) -> Result<(), RlsError>;

    /// The subscription expired and has been removed
    fn terminate_subscription(&self, notification: &RlsNotification) {
        let _ = notification;
    }

    /// Decide whether `subscriber` may watch `list_uri`
    fn authorize_subscription(&self, subscriber: &str, list_uri: &str) -> AuthorizationStatus {
        let _ = (subscriber, list_uri);
        AuthorizationStatus::Allowed
    }
}
