//! Resource list server (RLS) dispatcher
//!
//! Batches many individual resource subscriptions into per-list
//! notifications and rate-limits how many go out per timer tick.
//!
//! # Architecture
//!
//! ```text
//!   NotifierDomain                      RlsDispatcher
//!  ┌──────────────┐  NotifyInfo   ┌───────────────────────────┐
//!  │  notifiers   │ ────────────► │ queue: MessageQueue       │
//!  └──────────────┘               │ state: Mutex<RlsState {   │
//!                                 │   changed: i64,           │
//!                                 │   manager: [RlsSub {      │
//!                                 │     changed,              │
//!                                 │     virtuals: [VS, VS],   │
//!                                 │   }],                     │
//!                                 │   cursor,                 │
//!                                 │ }>                        │
//!                                 └─────────────┬─────────────┘
//!                                               │ tick()
//!                                               ▼
//!                                 RlsHandler::send_notify()  (≤ N per tick)
//! ```
//!
//! Every tick drains the queue (optionally bounded by
//! `max_messages_per_tick`) into the virtual subscriptions, then walks the
//! list subscriptions starting where the previous tick stopped and emits one
//! notification per changed list until the aggregate counter is consumed or
//! `max_notifications_at_once` is reached. Lists not reached keep their
//! changes for the next tick.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod manager;
pub mod virtual_subscription;

pub use config::RlsConfig;
pub use dispatcher::RlsDispatcher;
pub use error::RlsError;
pub use handler::{AuthorizationStatus, ResourceState, RlsHandler, RlsNotification};
pub use manager::{RlsSubscription, SubscriptionManager};
pub use virtual_subscription::{VirtualKey, VirtualSubscription};
