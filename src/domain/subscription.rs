//! Subscription handles and notifications
//!
//! A [`Subscription`] is a watcher registered in a package. The registry holds
//! one reference from `subscribe` until `unsubscribe`. A notifier that wants
//! to keep delivering after its callback returns takes its own reference with
//! [`accept_subscription`] and gives it back with [`release_subscription`].
//! Once the registry clears a subscription, [`notify_subscriber`] refuses new
//! notifications even though accepted handles keep the data alive.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::queue::{Message, MessageQueue, Payload};
use crate::refcount::RefCounter;

use super::content_type::ContentType;
use super::error::DomainError;
use super::package::Notifier;

/// Queue type that receives notifications for a subscription
pub type NotifyQueue = MessageQueue<NotifyInfo>;

/// Opaque data attached by the subscriber
pub type SubscriberData = Arc<dyn Any + Send + Sync>;

/// Status reported with every notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Subscription authorized, state follows
    Active,
    /// Waiting for authorization
    Pending,
    /// Subscription ended by the notifier
    Terminated,
    /// Subscription refused
    Rejected,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Terminated => "terminated",
            SubscriptionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Parameters for [`NotifierDomain::subscribe`](super::NotifierDomain::subscribe)
pub struct SubscribeParams {
    /// Watched record (e.g. a presentity URI)
    pub record_id: String,
    /// Identifier of the watcher
    pub subscriber_id: String,
    /// Where notifications are delivered
    pub destination: Arc<NotifyQueue>,
    /// Opaque subscriber data
    pub subscriber_data: Option<SubscriberData>,
}

impl SubscribeParams {
    pub fn new(
        record_id: impl Into<String>,
        subscriber_id: impl Into<String>,
        destination: Arc<NotifyQueue>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            subscriber_id: subscriber_id.into(),
            destination,
            subscriber_data: None,
        }
    }

    /// Attach subscriber data
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        let data: SubscriberData = Arc::new(data);
        self.subscriber_data = Some(data);
        self
    }
}

struct SubscriptionInner {
    id: u64,
    refs: RefCounter,
    allow_notifications: AtomicBool,
    package: String,
    record_id: String,
    subscriber_id: String,
    destination: Arc<NotifyQueue>,
    subscriber_data: Option<SubscriberData>,
}

/// Handle to a registered subscription
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn new(id: u64, package: &str, refs: RefCounter, params: SubscribeParams) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                id,
                refs,
                allow_notifications: AtomicBool::new(true),
                package: package.to_string(),
                record_id: params.record_id,
                subscriber_id: params.subscriber_id,
                destination: params.destination,
                subscriber_data: params.subscriber_data,
            }),
        }
    }

    /// Unique id within the domain
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Package name this subscription was created in
    pub fn package(&self) -> &str {
        &self.inner.package
    }

    pub fn record_id(&self) -> &str {
        &self.inner.record_id
    }

    pub fn subscriber_id(&self) -> &str {
        &self.inner.subscriber_id
    }

    /// Queue notifications are pushed to
    pub fn destination(&self) -> &Arc<NotifyQueue> {
        &self.inner.destination
    }

    /// Subscriber data, if it is of type `T`
    pub fn subscriber_data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner
            .subscriber_data
            .as_ref()
            .and_then(|data| data.downcast_ref::<T>())
    }

    /// Whether notifications are still accepted
    pub fn is_active(&self) -> bool {
        self.inner.allow_notifications.load(Ordering::Acquire)
    }

    /// Number of outstanding references
    pub fn reference_count(&self) -> usize {
        self.inner.refs.count()
    }

    /// Whether two handles refer to the same subscription
    pub fn same_as(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Another handle to the same subscription without taking a reference
    pub(crate) fn share(&self) -> Subscription {
        Subscription {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stop accepting notifications
    pub(crate) fn clear(&self) {
        let _guard = self.inner.refs.lock().lock();
        self.inner
            .allow_notifications
            .store(false, Ordering::Release);
    }

    pub(crate) fn release_reference(&self) -> bool {
        self.inner.refs.remove_reference()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("package", &self.inner.package)
            .field("record_id", &self.inner.record_id)
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("active", &self.is_active())
            .field("refs", &self.reference_count())
            .finish()
    }
}

/// Take a reference to a subscription for processing after a callback returns
pub fn accept_subscription(subscription: &Subscription) -> Subscription {
    subscription.inner.refs.add_reference();
    subscription.share()
}

/// Give back a reference taken with [`accept_subscription`]
///
/// Returns `true` if this was the last reference.
pub fn release_subscription(subscription: Subscription) -> bool {
    let last = subscription.release_reference();
    if last {
        tracing::trace!(
            subscription_id = subscription.id(),
            record_id = %subscription.record_id(),
            "Subscription reclaimed"
        );
    }
    last
}

/// Deliver a notification to a subscription's destination queue
///
/// Fails with [`DomainError::SubscriptionCleared`] once the subscription has
/// been unsubscribed.
pub fn notify_subscriber(
    subscription: &Subscription,
    notifier: &Notifier,
    content_type: Option<Arc<ContentType>>,
    data: Bytes,
    status: SubscriptionStatus,
) -> Result<(), DomainError> {
    let _guard = subscription.inner.refs.lock().lock();

    if !subscription.is_active() {
        return Err(DomainError::SubscriptionCleared);
    }

    subscription.inner.refs.add_reference();
    let info = NotifyInfo {
        package: subscription.inner.package.clone(),
        record_id: subscription.inner.record_id.clone(),
        subscription: subscription.share(),
        content_type,
        data,
        status,
    };

    tracing::trace!(
        notifier_id = notifier.id(),
        subscription_id = subscription.id(),
        record_id = %subscription.record_id(),
        status = %status,
        "Notification queued"
    );

    subscription
        .inner
        .destination
        .push_message(Message::new(info))?;
    Ok(())
}

/// A notification as seen by the subscriber
///
/// Holds a reference to the originating subscription, given back on drop.
pub struct NotifyInfo {
    /// Package the notification belongs to
    pub package: String,
    /// Record whose state changed
    pub record_id: String,
    subscription: Subscription,
    /// Type of `data`
    pub content_type: Option<Arc<ContentType>>,
    /// Notification body
    pub data: Bytes,
    /// Subscription status reported by the notifier
    pub status: SubscriptionStatus,
}

impl NotifyInfo {
    /// Originating subscription
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Content type name, if any
    pub fn content_type_name(&self) -> Option<&str> {
        self.content_type.as_ref().map(|ct| ct.name())
    }
}

impl Payload for NotifyInfo {}

impl Drop for NotifyInfo {
    fn drop(&mut self) {
        if let Some(ref content_type) = self.content_type {
            content_type.release(&self.data);
        }
        // registry reference may already be gone
        self.subscription.release_reference();
    }
}

impl std::fmt::Debug for NotifyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyInfo")
            .field("package", &self.package)
            .field("record_id", &self.record_id)
            .field("subscription_id", &self.subscription.id())
            .field("content_type", &self.content_type_name())
            .field("len", &self.data.len())
            .field("status", &self.status)
            .finish()
    }
}
