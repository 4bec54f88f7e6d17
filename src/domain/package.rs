//! Packages and notifiers
//!
//! A package pairs the notifiers producing one event type with the
//! subscriptions watching it.

use std::sync::Arc;

use super::subscription::Subscription;

/// Callbacks a notifier exposes to the registry
///
/// Both methods run while the domain lock is held. They must not call back
/// into the same domain; work that outlives the callback should accept the
/// subscription and continue elsewhere.
pub trait NotifierHandler: Send + Sync + 'static {
    /// A subscription appeared in the notifier's package
    fn on_subscribe(&self, notifier: &Notifier, subscription: &Subscription);

    /// A subscription left the notifier's package
    fn on_unsubscribe(&self, notifier: &Notifier, subscription: &Subscription);
}

/// A registered state source
pub struct Notifier {
    id: u64,
    package: String,
    handler: Arc<dyn NotifierHandler>,
}

impl Notifier {
    pub(crate) fn new(id: u64, package: &str, handler: Arc<dyn NotifierHandler>) -> Self {
        Self {
            id,
            package: package.to_string(),
            handler,
        }
    }

    /// Unique id within the domain
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Package the notifier is registered in
    pub fn package(&self) -> &str {
        &self.package
    }

    pub(crate) fn subscribe(&self, subscription: &Subscription) {
        self.handler.on_subscribe(self, subscription);
    }

    pub(crate) fn unsubscribe(&self, subscription: &Subscription) {
        self.handler.on_unsubscribe(self, subscription);
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("id", &self.id)
            .field("package", &self.package)
            .finish()
    }
}

/// Named bucket of notifiers and subscriptions
pub(crate) struct Package {
    pub(crate) name: String,
    pub(crate) notifiers: Vec<Arc<Notifier>>,
    pub(crate) subscriptions: Vec<Subscription>,
}

impl Package {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            notifiers: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Package names compare case-insensitively
    pub(crate) fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Unlink everything without running callbacks
    ///
    /// Subscriptions are cleared and the registry's reference is dropped;
    /// notifiers holding accepted handles keep them alive until released.
    pub(crate) fn destroy(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.clear();
            subscription.release_reference();
        }
        self.notifiers.clear();
    }
}
