//! Virtual subscriptions
//!
//! A virtual subscription is the dispatcher's view of one list member: it
//! wraps the domain subscription for that resource and remembers the latest
//! state delivered for it until the next aggregated notification goes out.

use bytes::Bytes;

use crate::domain::{NotifyInfo, Subscription, SubscriptionStatus};

use super::handler::ResourceState;

/// Subscriber data attached to each domain subscription created by the
/// dispatcher, used to find the virtual subscription a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualKey {
    /// Owning list subscription
    pub rls_id: u64,
    /// Position in the list
    pub index: usize,
}

/// One member of a list subscription
#[derive(Debug)]
pub struct VirtualSubscription {
    uri: String,
    pub(crate) subscription: Option<Subscription>,
    status: SubscriptionStatus,
    content_type: Option<String>,
    body: Option<Bytes>,
    changed: i64,
}

impl VirtualSubscription {
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            subscription: None,
            status: SubscriptionStatus::Pending,
            content_type: None,
            body: None,
            changed: 0,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Notifications applied since the last aggregated notification
    pub fn changed(&self) -> i64 {
        self.changed
    }

    /// Apply a resource notification
    ///
    /// Returns the amount the change counters grow by.
    pub(crate) fn process_notification(&mut self, info: &NotifyInfo) -> i64 {
        self.status = info.status;
        self.content_type = info.content_type_name().map(str::to_string);
        self.body = if info.data.is_empty() {
            None
        } else {
            Some(info.data.clone())
        };
        self.changed += 1;

        tracing::trace!(
            resource = %self.uri,
            status = %self.status,
            changed = self.changed,
            "Resource notification applied"
        );

        1
    }

    /// Snapshot for an outgoing notification, clearing the change count
    pub(crate) fn take_state(&mut self) -> ResourceState {
        let state = self.state();
        self.changed = 0;
        state
    }

    /// Snapshot without touching the change count
    pub(crate) fn state(&self) -> ResourceState {
        ResourceState {
            uri: self.uri.clone(),
            status: self.status,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
            changed: self.changed > 0,
        }
    }
}
