//! Notifier domain implementation
//!
//! The domain owns every package and serializes all structural changes
//! through one lock. Catch-up callbacks run under that lock, so nothing can
//! observe a freshly linked notifier or subscription before it has been
//! introduced to the other side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::refcount::ReferenceCounterGroup;

use super::config::DomainConfig;
use super::content_type::{ContentReleaseFn, ContentType, ContentTypeRegistry};
use super::error::DomainError;
use super::package::{Notifier, NotifierHandler, Package};
use super::subscription::{SubscribeParams, Subscription};

/// Registry of packages, notifiers and subscriptions
pub struct NotifierDomain {
    name: String,
    packages: Mutex<Vec<Package>>,
    content_types: ContentTypeRegistry,
    ref_group: ReferenceCounterGroup,
    next_id: AtomicU64,
    config: DomainConfig,
}

impl NotifierDomain {
    /// Create a domain with default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, DomainConfig::default())
    }

    /// Create a domain with custom configuration
    pub fn with_config(name: impl Into<String>, config: DomainConfig) -> Self {
        let name = name.into();
        tracing::info!(domain = %name, "Notifier domain created");

        Self {
            name,
            packages: Mutex::new(Vec::with_capacity(config.package_capacity)),
            content_types: ContentTypeRegistry::new(),
            ref_group: ReferenceCounterGroup::new(config.reference_group_size),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Tear down every package
    ///
    /// Subscriptions are cleared without unsubscribe callbacks and notifiers
    /// are dropped. Content types are forgotten. The domain itself stays
    /// usable and empty.
    pub async fn destroy(&self) {
        let mut packages = self.packages.lock().await;

        for package in packages.iter_mut() {
            tracing::debug!(
                domain = %self.name,
                package = %package.name,
                notifiers = package.notifiers.len(),
                subscriptions = package.subscriptions.len(),
                "Destroying package"
            );
            package.destroy();
        }
        packages.clear();
        drop(packages);

        self.content_types.clear();
        tracing::info!(domain = %self.name, "Notifier domain destroyed");
    }

    /// Register a notifier for a package
    ///
    /// The package is created if needed. Before returning, the notifier's
    /// subscribe callback runs once for every subscription already in the
    /// package, in subscription order.
    pub async fn register_notifier(
        &self,
        package: &str,
        handler: Arc<dyn NotifierHandler>,
    ) -> Result<Arc<Notifier>, DomainError> {
        if package.is_empty() {
            return Err(DomainError::EmptyPackageName);
        }

        let mut packages = self.packages.lock().await;
        let pkg = find_or_create(&mut packages, package);

        let notifier = Arc::new(Notifier::new(self.allocate_id(), &pkg.name, handler));
        pkg.notifiers.push(Arc::clone(&notifier));

        for subscription in &pkg.subscriptions {
            notifier.subscribe(subscription);
        }

        tracing::info!(
            domain = %self.name,
            package = %pkg.name,
            notifier_id = notifier.id(),
            catchup = pkg.subscriptions.len(),
            "Notifier registered"
        );

        Ok(notifier)
    }

    /// Remove a notifier
    ///
    /// Existing subscriptions stay linked and receive no callback; they are
    /// introduced to whichever notifier registers next.
    pub async fn unregister_notifier(&self, notifier: &Notifier) -> Result<(), DomainError> {
        let mut packages = self.packages.lock().await;

        let pkg = packages
            .iter_mut()
            .find(|p| p.matches(notifier.package()))
            .ok_or_else(|| DomainError::NotifierNotFound(notifier.package().to_string()))?;

        let pos = pkg
            .notifiers
            .iter()
            .position(|n| std::ptr::eq(Arc::as_ptr(n), notifier))
            .ok_or_else(|| DomainError::NotifierNotFound(notifier.package().to_string()))?;
        pkg.notifiers.remove(pos);

        tracing::info!(
            domain = %self.name,
            package = %pkg.name,
            notifier_id = notifier.id(),
            orphaned = pkg.subscriptions.len(),
            "Notifier unregistered"
        );

        Ok(())
    }

    /// Subscribe to a package
    ///
    /// The package is created if needed. Before returning, every notifier
    /// already in the package has its subscribe callback run once for the new
    /// subscription.
    ///
    /// The returned handle represents the registry's reference; pass it to
    /// [`unsubscribe`](Self::unsubscribe) to end the subscription.
    pub async fn subscribe(
        &self,
        package: &str,
        params: SubscribeParams,
    ) -> Result<Subscription, DomainError> {
        if package.is_empty() {
            return Err(DomainError::EmptyPackageName);
        }
        if params.record_id.is_empty() {
            return Err(DomainError::EmptyRecordId);
        }

        let mut packages = self.packages.lock().await;
        let pkg = find_or_create(&mut packages, package);

        let subscription = Subscription::new(
            self.allocate_id(),
            &pkg.name,
            self.ref_group.init_reference_counter(),
            params,
        );
        pkg.subscriptions.push(subscription.share());

        for notifier in &pkg.notifiers {
            notifier.subscribe(&subscription);
        }

        tracing::debug!(
            domain = %self.name,
            package = %pkg.name,
            subscription_id = subscription.id(),
            record_id = %subscription.record_id(),
            subscriber_id = %subscription.subscriber_id(),
            notifiers = pkg.notifiers.len(),
            "Subscription added"
        );

        Ok(subscription)
    }

    /// End a subscription
    ///
    /// The subscription stops accepting notifications, is unlinked, and every
    /// notifier in the package has its unsubscribe callback run once. The
    /// registry's reference is dropped afterwards; handles accepted by
    /// notifiers stay valid until released.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let not_found = || DomainError::SubscriptionNotFound {
            package: subscription.package().to_string(),
            record_id: subscription.record_id().to_string(),
        };

        let removed = {
            let mut packages = self.packages.lock().await;

            let pkg = packages
                .iter_mut()
                .find(|p| p.matches(subscription.package()))
                .ok_or_else(not_found)?;

            let pos = pkg
                .subscriptions
                .iter()
                .position(|s| s.same_as(subscription))
                .ok_or_else(not_found)?;
            let removed = pkg.subscriptions.remove(pos);
            removed.clear();

            for notifier in &pkg.notifiers {
                notifier.unsubscribe(&removed);
            }

            tracing::debug!(
                domain = %self.name,
                package = %pkg.name,
                subscription_id = removed.id(),
                record_id = %removed.record_id(),
                notifiers = pkg.notifiers.len(),
                "Subscription removed"
            );

            removed
        };

        if removed.release_reference() {
            tracing::trace!(subscription_id = removed.id(), "Subscription reclaimed");
        }

        Ok(())
    }

    /// Register a content type for notification bodies
    pub fn register_content_type(
        &self,
        name: &str,
        release: Option<ContentReleaseFn>,
    ) -> Arc<ContentType> {
        self.content_types.register(name, release)
    }

    /// Look up a registered content type
    pub fn find_content_type(&self, name: &str) -> Option<Arc<ContentType>> {
        self.content_types.find(name)
    }

    /// Number of known packages
    pub async fn package_count(&self) -> usize {
        self.packages.lock().await.len()
    }

    /// Number of subscriptions in a package (0 if unknown)
    pub async fn subscription_count(&self, package: &str) -> usize {
        self.packages
            .lock()
            .await
            .iter()
            .find(|p| p.matches(package))
            .map_or(0, |p| p.subscriptions.len())
    }

    /// Number of notifiers in a package (0 if unknown)
    pub async fn notifier_count(&self, package: &str) -> usize {
        self.packages
            .lock()
            .await
            .iter()
            .find(|p| p.matches(package))
            .map_or(0, |p| p.notifiers.len())
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for NotifierDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierDomain")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

fn find_or_create<'a>(packages: &'a mut Vec<Package>, name: &str) -> &'a mut Package {
    match packages.iter().position(|p| p.matches(name)) {
        Some(pos) => &mut packages[pos],
        None => {
            tracing::debug!(package = name, "Package created");
            packages.push(Package::new(name));
            let last = packages.len() - 1;
            &mut packages[last]
        }
    }
}
