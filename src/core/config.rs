use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timing knobs for [`MetricMonitor`](crate::core::monitor::MetricMonitor).
///
/// Fixed at construction time; there is no live reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Expiration applied to cache entries written without an explicit one
    pub default_expiration: Duration,
    /// Period of the background cache sweep
    pub sweep_interval: Duration,
    /// Wait between successful refreshes of one metric
    pub poll_interval: Duration,
    /// Wait after a failed refresh before retrying
    pub error_backoff: Duration,
    /// Upper bound on a single refresh
    pub refresh_timeout: Duration,
    /// How long `shutdown` waits for polling tasks to exit
    pub shutdown_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
            refresh_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// On-disk settings for the `run` command, stored as JSON.
///
/// Every field is optional in the file; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_expiration_ms: u64,
    pub sweep_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub refresh_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    /// Delay between two statistics reports
    pub report_interval_ms: u64,
    /// Number of statistics reports before the session ends
    pub iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            default_expiration_ms: millis(monitor.default_expiration),
            sweep_interval_ms: millis(monitor.sweep_interval),
            poll_interval_ms: millis(monitor.poll_interval),
            error_backoff_ms: millis(monitor.error_backoff),
            refresh_timeout_ms: millis(monitor.refresh_timeout),
            shutdown_timeout_ms: millis(monitor.shutdown_timeout),
            report_interval_ms: 2000,
            iterations: 5,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl Config {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("perfmon").join("config.json"))
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            anyhow::bail!("sweep_interval_ms must be greater than zero");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.refresh_timeout_ms == 0 {
            anyhow::bail!("refresh_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            default_expiration: Duration::from_millis(self.default_expiration_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
            refresh_timeout: Duration::from_millis(self.refresh_timeout_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }
}
