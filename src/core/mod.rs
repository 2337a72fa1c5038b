// Core monitoring logic

pub mod cache;
pub mod cancel;
pub mod config;
pub mod events;
pub mod monitor;
pub mod simulated;
pub mod source;

// Re-export commonly used items
pub use cache::{CacheEntry, ExpiringCache, RemovalEvent, RemovalReason};
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{Config, MonitorConfig};
pub use events::{EventHub, SubscriptionId};
pub use monitor::{
    ChangeNotification, MetricMonitor, MetricReading, MetricStatistics, ShutdownReport,
    StatisticsSnapshot,
};
pub use simulated::SimulatedMetric;
pub use source::{clamp_percent, MetricSource, SharedSource};
