//! Dispatcher statistics

pub mod metrics;

pub use metrics::{DispatcherStats, TickReport};
