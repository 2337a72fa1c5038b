// perfmon library - public API

// Re-export error types
pub mod error;
pub use error::{PerfmonError, RefreshError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use crate::core::{
    ChangeNotification, Config, ExpiringCache, MetricMonitor, MetricSource, MetricStatistics,
    MonitorConfig, RemovalReason,
};

// Initialize logging. Warnings and above by default; RUST_LOG overrides.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
