//! List subscription manager
//!
//! Keeps list subscriptions in creation order, grants lifetimes within the
//! configured bounds and collects expired entries. The dispatcher owns the
//! manager inside its lock; nothing here locks on its own.

use std::time::{Duration, Instant};

use crate::domain::SubscriptionStatus;

use super::config::RlsConfig;
use super::handler::{ResourceState, RlsNotification};
use super::virtual_subscription::VirtualSubscription;

/// Instant `granted` after `now`, saturating instead of overflowing
pub(crate) fn expiry_after(now: Instant, granted: Duration) -> Instant {
    now.checked_add(granted)
        .or_else(|| now.checked_add(MAX_GRANTED_EXPIRATION))
        .unwrap_or(now)
}

/// One subscriber's subscription to a resource list
#[derive(Debug)]
pub struct RlsSubscription {
    id: u64,
    subscriber: String,
    list_uri: String,
    package: String,
    status: SubscriptionStatus,
    expires_at: Instant,
    version: u32,
    pub(crate) changed: i64,
    pub(crate) virtuals: Vec<VirtualSubscription>,
}

impl RlsSubscription {
    pub(crate) fn new(
        id: u64,
        subscriber: &str,
        list_uri: &str,
        package: &str,
        status: SubscriptionStatus,
        expires_at: Instant,
        resources: &[String],
    ) -> Self {
        Self {
            id,
            subscriber: subscriber.to_string(),
            list_uri: list_uri.to_string(),
            package: package.to_string(),
            status,
            expires_at,
            version: 0,
            changed: 0,
            virtuals: resources
                .iter()
                .map(|uri| VirtualSubscription::new(uri.as_str()))
                .collect(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    pub fn list_uri(&self) -> &str {
        &self.list_uri
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Pending changes not yet notified
    pub fn changed(&self) -> i64 {
        self.changed
    }

    pub fn virtual_subscriptions(&self) -> &[VirtualSubscription] {
        &self.virtuals
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Build the next notification and clear pending changes
    ///
    /// Returns the notification and the change amount it consumed.
    pub(crate) fn take_notification(&mut self, now: Instant) -> (RlsNotification, i64) {
        let consumed = self.changed;
        self.changed = 0;
        self.version = self.version.wrapping_add(1);

        let resources = self.virtuals.iter_mut().map(|vs| vs.take_state()).collect();
        (self.notification(now, resources), consumed)
    }

    /// Final notification for a subscription being torn down
    pub(crate) fn final_notification(&mut self, now: Instant) -> RlsNotification {
        self.status = SubscriptionStatus::Terminated;
        self.version = self.version.wrapping_add(1);

        let resources = self.virtuals.iter().map(|vs| vs.state()).collect();
        self.notification(now, resources)
    }

    fn notification(&self, now: Instant, resources: Vec<ResourceState>) -> RlsNotification {
        RlsNotification {
            subscription_id: self.id,
            subscriber: self.subscriber.clone(),
            list_uri: self.list_uri.clone(),
            package: self.package.clone(),
            status: self.status,
            version: self.version,
            expires_in: self.expires_at.saturating_duration_since(now),
            resources,
        }
    }
}

/// Ordered set of list subscriptions with expiration
#[derive(Debug)]
pub struct SubscriptionManager {
    entries: Vec<RlsSubscription>,
    next_id: u64,
    min_expiration: Duration,
    max_expiration: Duration,
    default_expiration: Duration,
}

/// Longest lifetime ever granted, whatever the configuration says
pub const MAX_GRANTED_EXPIRATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

impl SubscriptionManager {
    /// Create a manager using the configured expiration bounds
    ///
    /// Bounds are normalised: `max` is raised to `min` if below it, both are
    /// capped at [`MAX_GRANTED_EXPIRATION`] and the default is clamped into
    /// the resulting range.
    pub fn new(config: &RlsConfig) -> Self {
        let min = config.min_expiration.min(MAX_GRANTED_EXPIRATION);
        let max = config.max_expiration.max(min).min(MAX_GRANTED_EXPIRATION);

        Self {
            entries: Vec::new(),
            next_id: 1,
            min_expiration: min,
            max_expiration: max,
            default_expiration: config.default_expiration.clamp(min, max),
        }
    }

    /// Lifetime granted for a requested one (zero means default)
    pub fn grant_expiration(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.default_expiration
        } else {
            requested.clamp(self.min_expiration, self.max_expiration)
        }
    }

    pub(crate) fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, entry: RlsSubscription) {
        self.entries.push(entry);
    }

    pub fn get(&self, id: u64) -> Option<&RlsSubscription> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut RlsSubscription> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<RlsSubscription> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Extend a subscription's lifetime, returning the granted duration
    pub(crate) fn refresh(&mut self, id: u64, requested: Duration, now: Instant) -> Option<Duration> {
        let granted = self.grant_expiration(requested);
        let entry = self.get_mut(id)?;
        entry.expires_at = expiry_after(now, granted);
        Some(granted)
    }

    /// Remove and return every subscription expired at `now`
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<RlsSubscription> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.is_expired(now));
        self.entries = live;
        expired
    }

    pub(crate) fn take_all(&mut self) -> Vec<RlsSubscription> {
        std::mem::take(&mut self.entries)
    }

    pub fn entries(&self) -> &[RlsSubscription] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RlsSubscription] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
