//! Resource list dispatcher implementation
//!
//! Each list member is watched through an ordinary domain subscription whose
//! notifications land in the dispatcher's queue. A periodic tick applies
//! queued notifications to the virtual subscriptions, then emits aggregated
//! notifications for changed list subscriptions, at most
//! `max_notifications_at_once` per tick.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::domain::{NotifierDomain, NotifyInfo, NotifyQueue, SubscribeParams, SubscriptionStatus};
use crate::stats::{DispatcherStats, TickReport};

use super::config::RlsConfig;
use super::error::RlsError;
use super::handler::{AuthorizationStatus, RlsHandler};
use super::manager::{expiry_after, RlsSubscription, SubscriptionManager};
use super::virtual_subscription::VirtualKey;

/// Aggregate state guarded by the dispatcher lock
struct RlsState {
    /// Sum of pending changes over all list subscriptions
    changed: i64,
    manager: SubscriptionManager,
    /// Where the next emission walk starts
    cursor: usize,
    last_expiration_check: Instant,
    stats: DispatcherStats,
}

/// Resource list server dispatcher
pub struct RlsDispatcher<H: RlsHandler> {
    config: RlsConfig,
    domain: Arc<NotifierDomain>,
    handler: Arc<H>,
    queue: Arc<NotifyQueue>,
    state: Mutex<RlsState>,
    timer: SyncMutex<Option<AbortHandle>>,
}

impl<H: RlsHandler> RlsDispatcher<H> {
    /// Create a dispatcher watching resources in `domain`
    pub fn new(config: RlsConfig, domain: Arc<NotifierDomain>, handler: H) -> Self {
        tracing::info!(
            domain = %domain.name(),
            timer_interval_ms = config.timer_interval.as_millis() as u64,
            max_notifications_at_once = config.max_notifications_at_once,
            "RLS dispatcher initialized"
        );

        let state = RlsState {
            changed: 0,
            manager: SubscriptionManager::new(&config),
            cursor: 0,
            last_expiration_check: Instant::now(),
            stats: DispatcherStats::new(),
        };

        Self {
            config,
            domain,
            handler: Arc::new(handler),
            queue: Arc::new(NotifyQueue::new()),
            state: Mutex::new(state),
            timer: SyncMutex::new(None),
        }
    }

    pub fn config(&self) -> &RlsConfig {
        &self.config
    }

    pub fn domain(&self) -> &Arc<NotifierDomain> {
        &self.domain
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Queue receiving resource notifications
    pub fn notify_queue(&self) -> &Arc<NotifyQueue> {
        &self.queue
    }

    /// Subscribe `subscriber` to the resource list `list_uri`
    ///
    /// One domain subscription is created per resource in `package`, or in
    /// the configured default package when `package` is empty. If any of them
    /// fails the ones already created are removed again. Returns the list
    /// subscription id.
    pub async fn add_subscription(
        &self,
        subscriber: &str,
        list_uri: &str,
        package: &str,
        resources: &[String],
        expires: Duration,
    ) -> Result<u64, RlsError> {
        if resources.is_empty() {
            return Err(RlsError::EmptyResourceList(list_uri.to_string()));
        }

        let package = if package.is_empty() {
            self.config.default_package.as_str()
        } else {
            package
        };

        let status = match self.handler.authorize_subscription(subscriber, list_uri) {
            AuthorizationStatus::Allowed => SubscriptionStatus::Active,
            AuthorizationStatus::Pending => SubscriptionStatus::Pending,
            AuthorizationStatus::Rejected => {
                tracing::info!(
                    subscriber = subscriber,
                    list = list_uri,
                    "List subscription rejected"
                );
                return Err(RlsError::Rejected {
                    subscriber: subscriber.to_string(),
                    list_uri: list_uri.to_string(),
                });
            }
        };

        let mut state = self.state.lock().await;
        let now = Instant::now();
        let id = state.manager.allocate_id();
        let granted = state.manager.grant_expiration(expires);

        let mut entry = RlsSubscription::new(
            id,
            subscriber,
            list_uri,
            package,
            status,
            expiry_after(now, granted),
            resources,
        );

        for index in 0..entry.virtuals.len() {
            let params = SubscribeParams::new(
                entry.virtuals[index].uri(),
                subscriber,
                Arc::clone(&self.queue),
            )
            .with_data(VirtualKey { rls_id: id, index });

            match self.domain.subscribe(package, params).await {
                Ok(subscription) => entry.virtuals[index].subscription = Some(subscription),
                Err(e) => {
                    self.release_virtuals(&mut entry).await;
                    return Err(e.into());
                }
            }
        }

        state.manager.insert(entry);

        tracing::info!(
            subscription_id = id,
            subscriber = subscriber,
            list = list_uri,
            resources = resources.len(),
            status = %status,
            expires_secs = granted.as_secs(),
            "List subscription added"
        );

        Ok(id)
    }

    /// Extend a list subscription
    ///
    /// A zero lifetime ends the subscription. Returns the granted lifetime.
    pub async fn refresh_subscription(&self, id: u64, expires: Duration) -> Result<Duration, RlsError> {
        if expires.is_zero() {
            self.remove_subscription(id).await?;
            return Ok(Duration::ZERO);
        }

        let mut state = self.state.lock().await;
        let granted = state
            .manager
            .refresh(id, expires, Instant::now())
            .ok_or(RlsError::SubscriptionNotFound(id))?;

        tracing::debug!(
            subscription_id = id,
            expires_secs = granted.as_secs(),
            "List subscription refreshed"
        );

        Ok(granted)
    }

    /// Remove a list subscription and every resource subscription under it
    pub async fn remove_subscription(&self, id: u64) -> Result<(), RlsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let mut entry = state
            .manager
            .remove(id)
            .ok_or(RlsError::SubscriptionNotFound(id))?;
        state.changed -= entry.changed;
        self.release_virtuals(&mut entry).await;

        tracing::info!(
            subscription_id = id,
            subscriber = %entry.subscriber(),
            list = %entry.list_uri(),
            "List subscription removed"
        );

        Ok(())
    }

    /// Run one dispatch round
    ///
    /// Collects expired subscriptions when due, applies queued resource
    /// notifications, then emits aggregated notifications for changed list
    /// subscriptions within the admission limit.
    pub async fn tick(&self) -> TickReport {
        let started = Instant::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let mut report = TickReport::default();

        if started.duration_since(state.last_expiration_check)
            >= self.config.expiration_check_interval
        {
            state.last_expiration_check = started;
            report.expired = self.expire_subscriptions(state, started).await;
        }

        report.applied = self.apply_queued(state);

        if state.changed > 0 {
            report.emitted = self.emit_changed(state, started);
        }

        if state.changed < 0 {
            tracing::warn!(
                changed = state.changed,
                "Changed subscription counter negative, resetting"
            );
            state.changed = 0;
            state.stats.counter_repairs += 1;
        }

        state.stats.ticks += 1;
        state.stats.last_tick_duration = started.elapsed();

        if report != TickReport::default() {
            tracing::debug!(
                applied = report.applied,
                emitted = report.emitted,
                expired = report.expired,
                pending = state.changed,
                "RLS tick"
            );
        }

        report
    }

    /// Spawn the periodic dispatch task
    ///
    /// The task runs until [`shutdown`](Self::shutdown), until the returned
    /// handle is aborted, or until the last `Arc` to the dispatcher is
    /// dropped. Dropping the dispatcher without `shutdown` leaves its
    /// resource subscriptions in the domain.
    pub fn spawn_timer_task(self: &Arc<Self>) -> JoinHandle<()> {
        let dispatcher: Weak<Self> = Arc::downgrade(self);
        let period = self.config.timer_interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(dispatcher) = dispatcher.upgrade() else {
                    tracing::debug!("RLS dispatcher dropped, timer stopping");
                    break;
                };
                dispatcher.tick().await;
            }
        });

        if let Some(previous) = self.timer.lock().replace(handle.abort_handle()) {
            previous.abort();
        }

        handle
    }

    /// Stop the timer and release every subscription and queued notification
    pub async fn shutdown(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }

        let mut state = self.state.lock().await;
        let entries = state.manager.take_all();
        let count = entries.len();
        for mut entry in entries {
            self.release_virtuals(&mut entry).await;
        }
        state.changed = 0;
        state.cursor = 0;
        drop(state);

        let released = self.queue.clear();

        tracing::info!(
            subscriptions = count,
            released_notifications = released,
            "RLS dispatcher shut down"
        );
    }

    /// Number of list subscriptions
    pub async fn subscription_count(&self) -> usize {
        self.state.lock().await.manager.len()
    }

    /// Aggregate pending change counter
    pub async fn changed_count(&self) -> i64 {
        self.state.lock().await.changed
    }

    /// Pending changes of one list subscription
    pub async fn pending_changes(&self, id: u64) -> Option<i64> {
        self.state.lock().await.manager.get(id).map(|e| e.changed())
    }

    /// Current statistics
    pub async fn stats(&self) -> DispatcherStats {
        self.state.lock().await.stats.clone()
    }

    async fn expire_subscriptions(&self, state: &mut RlsState, now: Instant) -> usize {
        let expired = state.manager.expire(now);
        let count = expired.len();

        for mut entry in expired {
            state.changed -= entry.changed;

            let notification = entry.final_notification(now);
            self.handler.terminate_subscription(&notification);
            self.release_virtuals(&mut entry).await;

            tracing::info!(
                subscription_id = entry.id(),
                subscriber = %entry.subscriber(),
                list = %entry.list_uri(),
                "List subscription expired"
            );
        }

        state.stats.subscriptions_expired += count as u64;
        count
    }

    fn apply_queued(&self, state: &mut RlsState) -> usize {
        let limit = self.config.max_messages_per_tick;
        let mut processed = 0;

        while limit == 0 || processed < limit {
            let Some(msg) = self.queue.pop_message() else {
                break;
            };
            if process_rls_notification(state, msg.data()) {
                state.stats.notifications_applied += 1;
            } else {
                state.stats.notifications_discarded += 1;
            }
            processed += 1;
        }

        processed
    }

    fn emit_changed(&self, state: &mut RlsState, now: Instant) -> usize {
        let len = state.manager.len();
        let max = self.config.max_notifications_at_once;
        let mut emitted = 0;
        let mut visited = 0;
        let mut idx = if len > 0 { state.cursor % len } else { 0 };

        while visited < len && state.changed > 0 && (max == 0 || emitted < max) {
            let entry = &mut state.manager.entries_mut()[idx];

            if entry.changed > 0 {
                let (notification, consumed) = entry.take_notification(now);
                state.changed -= consumed;
                emitted += 1;

                if let Err(e) = self.handler.send_notify(&notification) {
                    tracing::warn!(
                        subscription_id = notification.subscription_id,
                        subscriber = %notification.subscriber,
                        error = %e,
                        "Failed to send list notification"
                    );
                    state.stats.delivery_failures += 1;
                }
            }

            idx = (idx + 1) % len;
            visited += 1;
        }
        state.cursor = idx;

        // A full pass consumed every pending change; anything left is stale.
        if visited == len && state.changed > 0 {
            tracing::warn!(
                changed = state.changed,
                "Changed subscription counter out of sync, resetting"
            );
            state.changed = 0;
            state.stats.counter_repairs += 1;
        }

        state.stats.notifications_emitted += emitted as u64;
        emitted
    }

    async fn release_virtuals(&self, entry: &mut RlsSubscription) {
        for vs in entry.virtuals.iter_mut() {
            if let Some(subscription) = vs.subscription.take() {
                if let Err(e) = self.domain.unsubscribe(&subscription).await {
                    tracing::warn!(
                        resource = %vs.uri(),
                        error = %e,
                        "Failed to remove resource subscription"
                    );
                }
            }
        }
    }
}

impl<H: RlsHandler> Drop for RlsDispatcher<H> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

/// Apply one queued resource notification to its virtual subscription
///
/// Returns `false` if the notification belongs to a list subscription that
/// no longer exists.
fn process_rls_notification(state: &mut RlsState, info: &NotifyInfo) -> bool {
    let Some(key) = info.subscription().subscriber_data::<VirtualKey>().copied() else {
        tracing::trace!(record_id = %info.record_id, "Notification without virtual subscription");
        return false;
    };

    let Some(entry) = state.manager.get_mut(key.rls_id) else {
        tracing::trace!(
            subscription_id = key.rls_id,
            record_id = %info.record_id,
            "Notification for removed list subscription"
        );
        return false;
    };

    let Some(vs) = entry.virtuals.get_mut(key.index) else {
        return false;
    };

    let delta = vs.process_notification(info);
    entry.changed += delta;
    state.changed += delta;
    true
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::{
        accept_subscription, notify_subscriber, release_subscription, Notifier, NotifierHandler,
        Subscription,
    };
    use crate::rls::handler::RlsNotification;

    /// Presence source accepting every watcher and publishing on demand
    #[derive(Default)]
    struct PresenceSource {
        watchers: SyncMutex<Vec<Subscription>>,
    }

    impl NotifierHandler for PresenceSource {
        fn on_subscribe(&self, _notifier: &Notifier, subscription: &Subscription) {
            self.watchers.lock().push(accept_subscription(subscription));
        }

        fn on_unsubscribe(&self, _notifier: &Notifier, subscription: &Subscription) {
            let mut watchers = self.watchers.lock();
            if let Some(pos) = watchers.iter().position(|s| s.same_as(subscription)) {
                release_subscription(watchers.remove(pos));
            }
        }
    }

    impl PresenceSource {
        fn publish(&self, notifier: &Notifier, record_id: &str, body: &'static [u8]) -> usize {
            let watchers = self.watchers.lock();
            watchers
                .iter()
                .filter(|s| s.record_id() == record_id)
                .filter(|s| {
                    notify_subscriber(
                        s,
                        notifier,
                        None,
                        Bytes::from_static(body),
                        SubscriptionStatus::Active,
                    )
                    .is_ok()
                })
                .count()
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: SyncMutex<Vec<RlsNotification>>,
        terminated: SyncMutex<Vec<RlsNotification>>,
        reject: bool,
    }

    impl RlsHandler for Recorder {
        fn send_notify(&self, notification: &RlsNotification) -> Result<(), RlsError> {
            self.sent.lock().push(notification.clone());
            Ok(())
        }

        fn terminate_subscription(&self, notification: &RlsNotification) {
            self.terminated.lock().push(notification.clone());
        }

        fn authorize_subscription(&self, _subscriber: &str, _list_uri: &str) -> AuthorizationStatus {
            if self.reject {
                AuthorizationStatus::Rejected
            } else {
                AuthorizationStatus::Allowed
            }
        }
    }

    struct Fixture {
        dispatcher: RlsDispatcher<Recorder>,
        source: Arc<PresenceSource>,
        notifier: Arc<Notifier>,
    }

    async fn fixture(config: RlsConfig, handler: Recorder) -> Fixture {
        let domain = Arc::new(NotifierDomain::new("pres"));
        let source = Arc::new(PresenceSource::default());
        let notifier = domain
            .register_notifier("presence", source.clone())
            .await
            .unwrap();

        Fixture {
            dispatcher: RlsDispatcher::new(config, domain, handler),
            source,
            notifier,
        }
    }

    fn resource(i: usize) -> String {
        format!("sip:user{}@example.com", i)
    }

    async fn add_lists(fx: &Fixture, count: usize) -> Vec<u64> {
        let mut ids = Vec::new();
        for i in 0..count {
            let id = fx
                .dispatcher
                .add_subscription(
                    &format!("sip:watcher{}@example.com", i),
                    "sip:buddies@example.com",
                    "presence",
                    &[resource(i)],
                    Duration::from_secs(600),
                )
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }

    #[tokio::test]
    async fn test_admission_control() {
        let config = RlsConfig::default().max_notifications_at_once(3);
        let fx = fixture(config, Recorder::default()).await;
        add_lists(&fx, 10).await;

        for i in 0..10 {
            assert_eq!(fx.source.publish(&fx.notifier, &resource(i), b"open"), 1);
        }

        let first = fx.dispatcher.tick().await;
        assert_eq!(first.applied, 10);
        assert_eq!(first.emitted, 3);
        assert_eq!(fx.dispatcher.changed_count().await, 7);

        let mut emitted = vec![first.emitted];
        let mut counters = vec![fx.dispatcher.changed_count().await];
        for _ in 0..3 {
            emitted.push(fx.dispatcher.tick().await.emitted);
            counters.push(fx.dispatcher.changed_count().await);
        }

        assert_eq!(emitted, vec![3, 3, 3, 1]);
        assert_eq!(counters, vec![7, 4, 1, 0]);

        // Every list got exactly one notification carrying its resource
        let sent = fx.dispatcher.handler().sent.lock().clone();
        assert_eq!(sent.len(), 10);
        let mut ids: Vec<u64> = sent.iter().map(|n| n.subscription_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
        assert!(sent.iter().all(|n| n.changed_resources().count() == 1));

        // Nothing left for the next tick
        assert_eq!(fx.dispatcher.tick().await.emitted, 0);
    }

    #[tokio::test]
    async fn test_negative_counter_clamped() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;
        add_lists(&fx, 2).await;

        fx.dispatcher.state.lock().await.changed = -5;

        let report = fx.dispatcher.tick().await;
        assert_eq!(report.emitted, 0);
        assert_eq!(fx.dispatcher.changed_count().await, 0);
        assert!(fx.dispatcher.handler().sent.lock().is_empty());

        let stats = fx.dispatcher.stats().await;
        assert_eq!(stats.counter_repairs, 1);
    }

    #[tokio::test]
    async fn test_stale_positive_counter_repaired() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;
        add_lists(&fx, 2).await;

        fx.dispatcher.state.lock().await.changed = 4;

        let report = fx.dispatcher.tick().await;
        assert_eq!(report.emitted, 0);
        assert_eq!(fx.dispatcher.changed_count().await, 0);
    }

    #[tokio::test]
    async fn test_walk_resumes_after_last_emitted() {
        let config = RlsConfig::default().max_notifications_at_once(1);
        let fx = fixture(config, Recorder::default()).await;
        let ids = add_lists(&fx, 3).await;

        for i in 0..3 {
            fx.source.publish(&fx.notifier, &resource(i), b"open");
        }
        fx.dispatcher.tick().await;

        // The first list changes again, but the second one is still waiting
        fx.source.publish(&fx.notifier, &resource(0), b"busy");
        fx.dispatcher.tick().await;
        fx.dispatcher.tick().await;
        fx.dispatcher.tick().await;

        let order: Vec<u64> = fx
            .dispatcher
            .handler()
            .sent
            .lock()
            .iter()
            .map(|n| n.subscription_id)
            .collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_queue_drain_bounded() {
        let config = RlsConfig::default().max_messages_per_tick(2);
        let fx = fixture(config, Recorder::default()).await;
        add_lists(&fx, 5).await;

        for i in 0..5 {
            fx.source.publish(&fx.notifier, &resource(i), b"open");
        }

        let report = fx.dispatcher.tick().await;
        assert_eq!(report.applied, 2);
        assert_eq!(fx.dispatcher.notify_queue().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_subscription() {
        let handler = Recorder {
            reject: true,
            ..Default::default()
        };
        let fx = fixture(RlsConfig::default(), handler).await;

        let result = fx
            .dispatcher
            .add_subscription(
                "sip:mallory@example.com",
                "sip:buddies@example.com",
                "presence",
                &[resource(0)],
                Duration::ZERO,
            )
            .await;

        assert!(matches!(result, Err(RlsError::Rejected { .. })));
        assert_eq!(fx.dispatcher.subscription_count().await, 0);
        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 0);
    }

    #[tokio::test]
    async fn test_empty_resource_list() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;

        let result = fx
            .dispatcher
            .add_subscription("sip:bob@example.com", "sip:empty@example.com", "presence", &[], Duration::ZERO)
            .await;

        assert!(matches!(result, Err(RlsError::EmptyResourceList(_))));
    }

    #[tokio::test]
    async fn test_expired_subscription_terminated() {
        let config = RlsConfig::default()
            .expiration(Duration::ZERO, Duration::from_secs(60), Duration::from_secs(60))
            .expiration_check_interval(Duration::ZERO);
        let fx = fixture(config, Recorder::default()).await;

        let id = fx
            .dispatcher
            .add_subscription(
                "sip:bob@example.com",
                "sip:buddies@example.com",
                "presence",
                &[resource(0), resource(1)],
                Duration::from_millis(1),
            )
            .await
            .unwrap();
        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 2);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let report = fx.dispatcher.tick().await;

        assert_eq!(report.expired, 1);
        assert_eq!(fx.dispatcher.subscription_count().await, 0);
        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 0);

        let terminated = fx.dispatcher.handler().terminated.lock().clone();
        assert_eq!(terminated.len(), 1);
        assert_eq!(terminated[0].subscription_id, id);
        assert_eq!(terminated[0].status, SubscriptionStatus::Terminated);
        assert_eq!(terminated[0].resources.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_and_remove() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;
        let ids = add_lists(&fx, 1).await;

        let granted = fx
            .dispatcher
            .refresh_subscription(ids[0], Duration::from_secs(120))
            .await
            .unwrap();
        assert_eq!(granted, Duration::from_secs(120));

        fx.source.publish(&fx.notifier, &resource(0), b"open");
        fx.dispatcher.tick().await;
        fx.source.publish(&fx.notifier, &resource(0), b"away");

        // Zero lifetime removes the subscription
        let granted = fx
            .dispatcher
            .refresh_subscription(ids[0], Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(granted, Duration::ZERO);
        assert_eq!(fx.dispatcher.subscription_count().await, 0);
        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 0);

        // The notification queued before removal is discarded
        let report = fx.dispatcher.tick().await;
        assert_eq!(report.applied, 1);
        assert_eq!(report.emitted, 0);
        assert_eq!(fx.dispatcher.stats().await.notifications_discarded, 1);

        let result = fx.dispatcher.remove_subscription(ids[0]).await;
        assert!(matches!(result, Err(RlsError::SubscriptionNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_subtracts_pending_changes() {
        let fx = fixture(RlsConfig::default().max_notifications_at_once(1), Recorder::default()).await;
        let ids = add_lists(&fx, 2).await;

        fx.source.publish(&fx.notifier, &resource(0), b"open");
        fx.source.publish(&fx.notifier, &resource(1), b"open");
        fx.dispatcher.tick().await;
        assert_eq!(fx.dispatcher.pending_changes(ids[1]).await, Some(1));
        assert_eq!(fx.dispatcher.changed_count().await, 1);

        assert_ok!(fx.dispatcher.remove_subscription(ids[1]).await);
        assert_eq!(fx.dispatcher.changed_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;
        add_lists(&fx, 4).await;
        for i in 0..4 {
            fx.source.publish(&fx.notifier, &resource(i), b"open");
        }

        fx.dispatcher.shutdown().await;

        assert_eq!(fx.dispatcher.subscription_count().await, 0);
        assert_eq!(fx.dispatcher.changed_count().await, 0);
        assert!(fx.dispatcher.notify_queue().is_empty());
        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 0);
        assert!(fx.source.watchers.lock().is_empty());
        assert!(fx.dispatcher.handler().terminated.lock().is_empty());
    }

    #[tokio::test]
    async fn test_timer_task_dispatches() {
        let config = RlsConfig::default().timer_interval(Duration::from_millis(10));
        let fx = fixture(config, Recorder::default()).await;
        let dispatcher = Arc::new(fx.dispatcher);

        dispatcher
            .add_subscription(
                "sip:bob@example.com",
                "sip:buddies@example.com",
                "presence",
                &[resource(0)],
                Duration::ZERO,
            )
            .await
            .unwrap();
        fx.source.publish(&fx.notifier, &resource(0), b"open");

        let handle = dispatcher.spawn_timer_task();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sent = dispatcher.handler().sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].resources[0].body.as_deref(), Some(&b"open"[..]));

        dispatcher.shutdown().await;
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_timer_task_does_not_keep_dispatcher_alive() {
        let config = RlsConfig::default().timer_interval(Duration::from_millis(10));
        let fx = fixture(config, Recorder::default()).await;
        let dispatcher = Arc::new(fx.dispatcher);

        let handle = dispatcher.spawn_timer_task();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Arc::strong_count(&dispatcher), 1);

        drop(dispatcher);
        let finished = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn test_empty_package_uses_default() {
        let fx = fixture(RlsConfig::default(), Recorder::default()).await;

        let id = fx
            .dispatcher
            .add_subscription(
                "sip:bob@example.com",
                "sip:buddies@example.com",
                "",
                &[resource(0)],
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert_eq!(fx.dispatcher.domain().subscription_count("presence").await, 1);
        assert_eq!(fx.source.watchers.lock().len(), 1);

        fx.source.publish(&fx.notifier, &resource(0), b"open");
        fx.dispatcher.tick().await;

        let sent = fx.dispatcher.handler().sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subscription_id, id);
        assert_eq!(sent[0].package, "presence");
    }

    #[tokio::test]
    async fn test_huge_expiration_does_not_overflow() {
        let config = RlsConfig::default().expiration(Duration::ZERO, Duration::MAX, Duration::MAX);
        let fx = fixture(config, Recorder::default()).await;

        let id = fx
            .dispatcher
            .add_subscription(
                "sip:bob@example.com",
                "sip:buddies@example.com",
                "presence",
                &[resource(0)],
                Duration::MAX,
            )
            .await
            .unwrap();

        assert_ok!(fx.dispatcher.refresh_subscription(id, Duration::MAX).await);
        assert_eq!(fx.dispatcher.subscription_count().await, 1);
    }
}
