//! Presence event broker
//!
//! A small publish/subscribe engine for SIP presence:
//!
//! - [`queue`]: thread-safe message queues carrying notifications between
//!   producers and consumers without holding registry locks
//! - [`refcount`]: pooled-lock reference counters that keep a subscription
//!   alive while a notifier still works on it
//! - [`domain`]: the notifier domain, a registry of packages pairing
//!   notifiers with subscriptions, with catch-up in both directions
//! - [`rls`]: the resource list dispatcher, batching resource notifications
//!   into rate-limited per-list notifications on a periodic timer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use presence_broker::domain::{NotifierDomain, NotifyQueue, SubscribeParams};
//!
//! # async fn run() -> presence_broker::Result<()> {
//! let domain = Arc::new(NotifierDomain::new("pres"));
//! let inbox = Arc::new(NotifyQueue::new());
//!
//! let watcher = domain
//!     .subscribe(
//!         "presence",
//!         SubscribeParams::new("sip:alice@example.com", "sip:bob@example.com", inbox.clone()),
//!     )
//!     .await?;
//!
//! while let Some(msg) = inbox.pop_message() {
//!     println!("{:?}", msg.data());
//! }
//!
//! domain.unsubscribe(&watcher).await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod queue;
pub mod refcount;
pub mod rls;
pub mod stats;

pub use domain::{
    accept_subscription, notify_subscriber, release_subscription, NotifierDomain, NotifyInfo,
    Subscription, SubscriptionStatus,
};
pub use error::{Error, Result};
pub use queue::{Message, MessageQueue};
pub use refcount::{RefCounter, ReferenceCounterGroup};
pub use rls::{RlsConfig, RlsDispatcher, RlsHandler};
