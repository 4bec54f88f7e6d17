//! Statistics for the resource list dispatcher

use std::time::{Duration, Instant};

/// Dispatcher-wide counters, updated once per tick
#[derive(Debug, Clone)]
pub struct DispatcherStats {
    /// Ticks run
    pub ticks: u64,
    /// Resource notifications applied from the queue
    pub notifications_applied: u64,
    /// Aggregated notifications emitted
    pub notifications_emitted: u64,
    /// Emitted notifications the handler failed to deliver
    pub delivery_failures: u64,
    /// Queued notifications for subscriptions that no longer exist
    pub notifications_discarded: u64,
    /// Subscriptions removed by expiration
    pub subscriptions_expired: u64,
    /// Times the change counter had to be repaired
    pub counter_repairs: u64,
    /// Duration of the most recent tick
    pub last_tick_duration: Duration,
    /// When the dispatcher was created
    pub started_at: Instant,
}

impl DispatcherStats {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            notifications_applied: 0,
            notifications_emitted: 0,
            delivery_failures: 0,
            notifications_discarded: 0,
            subscriptions_expired: 0,
            counter_repairs: 0,
            last_tick_duration: Duration::ZERO,
            started_at: Instant::now(),
        }
    }

    /// Time since the dispatcher was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average notifications emitted per tick
    pub fn emitted_per_tick(&self) -> f64 {
        if self.ticks > 0 {
            self.notifications_emitted as f64 / self.ticks as f64
        } else {
            0.0
        }
    }
}

impl Default for DispatcherStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Queued resource notifications processed
    pub applied: usize,
    /// Aggregated notifications emitted
    pub emitted: usize,
    /// Subscriptions expired
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = DispatcherStats::new();
        assert_eq!(stats.ticks, 0);
        assert_eq!(stats.notifications_applied, 0);
        assert_eq!(stats.notifications_emitted, 0);
        assert_eq!(stats.counter_repairs, 0);
        assert_eq!(stats.last_tick_duration, Duration::ZERO);
    }

    #[test]
    fn test_emitted_per_tick() {
        let mut stats = DispatcherStats::new();
        assert_eq!(stats.emitted_per_tick(), 0.0);

        stats.ticks = 4;
        stats.notifications_emitted = 10;
        assert_eq!(stats.emitted_per_tick(), 2.5);
    }

    #[test]
    fn test_tick_report_default() {
        let report = TickReport::default();
        assert_eq!(report.applied, 0);
        assert_eq!(report.emitted, 0);
        assert_eq!(report.expired, 0);
    }
}
