//! Notifier domain: pub/sub registry for presence events
//!
//! A domain holds packages (one per event type such as `presence`). Each
//! package couples state producers ([`Notifier`]) with state consumers
//! ([`Subscription`]). Registration is symmetric: a late notifier is told
//! about every existing subscription and a new subscription is announced to
//! every existing notifier, both while the domain lock is held.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<NotifierDomain>
//!              ┌──────────────────────────────────┐
//!              │ packages: Mutex<Vec<Package {    │
//!              │     notifiers:     [N1, N2],     │
//!              │     subscriptions: [S1, S2, S3], │
//!              │ }>>                              │
//!              └────────────────┬─────────────────┘
//!                               │ on_subscribe / on_unsubscribe
//!                               ▼
//!                          [Notifier]
//!                  notify_subscriber(S1, ...)
//!                               │
//!                               ▼
//!                  S1.destination: MessageQueue<NotifyInfo>
//! ```
//!
//! Notifiers never write to subscriber state directly. They push a
//! [`NotifyInfo`] onto the subscription's queue and the subscriber drains it
//! on its own schedule.

pub mod config;
pub mod content_type;
pub mod error;
pub mod package;
pub mod store;
pub mod subscription;

pub use config::DomainConfig;
pub use content_type::{ContentReleaseFn, ContentType, ContentTypeRegistry};
pub use error::DomainError;
pub use package::{Notifier, NotifierHandler};
pub use store::NotifierDomain;
pub use subscription::{
    accept_subscription, notify_subscriber, release_subscription, NotifyInfo, NotifyQueue,
    SubscribeParams, SubscriberData, Subscription, SubscriptionStatus,
};
