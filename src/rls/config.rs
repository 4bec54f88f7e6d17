//! Resource list dispatcher configuration

use std::time::Duration;

/// Configuration for an [`RlsDispatcher`](super::RlsDispatcher)
#[derive(Debug, Clone)]
pub struct RlsConfig {
    /// Period of the dispatch timer
    pub timer_interval: Duration,

    /// Maximum notifications emitted per tick (0 = unlimited)
    pub max_notifications_at_once: usize,

    /// Maximum queued resource notifications applied per tick (0 = unlimited)
    pub max_messages_per_tick: usize,

    /// Shortest subscription lifetime granted
    pub min_expiration: Duration,

    /// Longest subscription lifetime granted
    pub max_expiration: Duration,

    /// Lifetime granted when the subscriber does not ask for one
    pub default_expiration: Duration,

    /// How often expired subscriptions are looked for
    pub expiration_check_interval: Duration,

    /// Package used for resource subscriptions when none is given
    pub default_package: String,
}

impl Default for RlsConfig {
    fn default() -> Self {
        Self {
            timer_interval: Duration::from_secs(10),
            max_notifications_at_once: 1000,
            max_messages_per_tick: 0, // Unlimited
            min_expiration: Duration::from_secs(60),
            max_expiration: Duration::from_secs(7200),
            default_expiration: Duration::from_secs(3600),
            expiration_check_interval: Duration::from_secs(10),
            default_package: "presence".to_string(),
        }
    }
}

impl RlsConfig {
    /// Set the dispatch timer period
    pub fn timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    /// Set the per-tick notification limit
    pub fn max_notifications_at_once(mut self, max: usize) -> Self {
        self.max_notifications_at_once = max;
        self
    }

    /// Set the per-tick queue drain limit
    pub fn max_messages_per_tick(mut self, max: usize) -> Self {
        self.max_messages_per_tick = max;
        self
    }

    /// Set the expiration bounds
    ///
    /// `default` is clamped into `[min, max]`.
    pub fn expiration(mut self, min: Duration, max: Duration, default: Duration) -> Self {
        let max = max.max(min);
        self.min_expiration = min;
        self.max_expiration = max;
        self.default_expiration = default.clamp(min, max);
        self
    }

    /// Set how often expired subscriptions are collected
    pub fn expiration_check_interval(mut self, interval: Duration) -> Self {
        self.expiration_check_interval = interval;
        self
    }

    /// Set the default resource package
    pub fn default_package(mut self, package: impl Into<String>) -> Self {
        self.default_package = package.into();
        self
    }
}
