//! Presence broker demo
//!
//! Run with: cargo run --example presence_server [TICK_MS]
//!
//! Registers a simulated presence agent, subscribes a few resource lists
//! through the RLS dispatcher and lets the agent publish random-ish status
//! changes. The dispatcher prints the aggregated notifications it would send.
//!
//! Set `RUST_LOG=presence_broker=debug` to see registry and tick activity.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use presence_broker::domain::{
    accept_subscription, notify_subscriber, release_subscription, ContentType, Notifier,
    NotifierDomain, NotifierHandler, Subscription, SubscriptionStatus,
};
use presence_broker::rls::{RlsConfig, RlsDispatcher, RlsError, RlsHandler, RlsNotification};

const USERS: [&str; 4] = [
    "sip:alice@example.com",
    "sip:carol@example.com",
    "sip:dave@example.com",
    "sip:erin@example.com",
];

const STATES: [&str; 3] = ["open", "busy", "closed"];

struct SimulatedAgent {
    content_type: Arc<ContentType>,
    watchers: Mutex<Vec<Subscription>>,
}

impl NotifierHandler for SimulatedAgent {
    fn on_subscribe(&self, _notifier: &Notifier, subscription: &Subscription) {
        self.watchers.lock().push(accept_subscription(subscription));
    }

    fn on_unsubscribe(&self, _notifier: &Notifier, subscription: &Subscription) {
        let mut watchers = self.watchers.lock();
        if let Some(pos) = watchers.iter().position(|w| w.same_as(subscription)) {
            release_subscription(watchers.remove(pos));
        }
    }
}

impl SimulatedAgent {
    fn publish(&self, notifier: &Notifier, user: &str, state: &str) {
        let body = Bytes::from(format!(
            "<presence entity=\"{}\"><tuple><status><basic>{}</basic></status></tuple></presence>",
            user, state
        ));

        for watcher in self.watchers.lock().iter().filter(|w| w.record_id() == user) {
            if let Err(e) = notify_subscriber(
                watcher,
                notifier,
                Some(Arc::clone(&self.content_type)),
                body.clone(),
                SubscriptionStatus::Active,
            ) {
                tracing::warn!(user = user, error = %e, "Publish failed");
            }
        }
    }
}

struct PrintingHandler;

impl RlsHandler for PrintingHandler {
    fn send_notify(&self, notification: &RlsNotification) -> Result<(), RlsError> {
        let changed: Vec<&str> = notification
            .changed_resources()
            .map(|r| r.uri.as_str())
            .collect();

        println!(
            "NOTIFY {} ({}) version={} changed={:?}",
            notification.subscriber, notification.list_uri, notification.version, changed
        );
        Ok(())
    }

    fn terminate_subscription(&self, notification: &RlsNotification) {
        println!("TERMINATED {}", notification.subscriber);
    }
}

#[tokio::main]
async fn main() -> presence_broker::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("presence_broker=info")),
        )
        .init();

    let tick_ms = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(500u64);

    let domain = Arc::new(NotifierDomain::new("pres"));
    let pidf = domain.register_content_type("application/pidf+xml", None);

    let agent = Arc::new(SimulatedAgent {
        content_type: pidf,
        watchers: Mutex::new(Vec::new()),
    });
    let notifier = domain.register_notifier("presence", agent.clone()).await?;

    let config = RlsConfig::default()
        .timer_interval(Duration::from_millis(tick_ms))
        .max_notifications_at_once(2);
    let dispatcher = Arc::new(RlsDispatcher::new(config, Arc::clone(&domain), PrintingHandler));

    let members: Vec<String> = USERS.iter().map(|u| u.to_string()).collect();
    for watcher in ["sip:bob@example.com", "sip:frank@example.com", "sip:gina@example.com"] {
        dispatcher
            .add_subscription(
                watcher,
                &format!("{};list=buddies", watcher),
                "presence",
                &members,
                Duration::from_secs(3600),
            )
            .await?;
    }

    let timer = dispatcher.spawn_timer_task();

    for round in 0..10usize {
        let user = USERS[round % USERS.len()];
        let state = STATES[round % STATES.len()];
        agent.publish(&notifier, user, state);
        tokio::time::sleep(Duration::from_millis(tick_ms / 2)).await;
    }

    tokio::time::sleep(Duration::from_millis(tick_ms * 4)).await;

    let stats = dispatcher.stats().await;
    println!(
        "ticks={} applied={} emitted={}",
        stats.ticks, stats.notifications_applied, stats.notifications_emitted
    );

    dispatcher.shutdown().await;
    let _ = timer.await;
    domain.unregister_notifier(&notifier).await?;
    domain.destroy().await;

    Ok(())
}
