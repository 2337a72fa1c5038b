//! Simulated metric sources used by the `run` command.
//!
//! They stand in for real samplers: each refresh waits a fixed latency, then
//! draws a uniformly random value from its range.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;

use crate::core::cancel::CancelSignal;
use crate::core::source::{clamp_percent, MetricSource};
use crate::error::RefreshError;

pub const DEFAULT_CPU_NAME: &str = "CPU Usage";
pub const DEFAULT_MEMORY_NAME: &str = "Memory Usage";

#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    value: f64,
    updated_at: Option<DateTime<Utc>>,
}

/// Probe with a fixed latency and value range.
#[derive(Debug)]
pub struct SimulatedMetric {
    name: String,
    latency: Duration,
    range: RangeInclusive<f64>,
    reading: RwLock<Reading>,
}

impl SimulatedMetric {
    pub fn new(name: impl Into<String>, latency: Duration, range: RangeInclusive<f64>) -> Self {
        Self {
            name: name.into(),
            latency,
            range,
            reading: RwLock::new(Reading::default()),
        }
    }

    /// CPU-like load: 100ms sample, readings between 20% and 80%.
    pub fn cpu() -> Self {
        Self::new(DEFAULT_CPU_NAME, Duration::from_millis(100), 20.0..=80.0)
    }

    /// Memory-like load: 150ms sample, readings between 40% and 70%.
    pub fn memory() -> Self {
        Self::new(DEFAULT_MEMORY_NAME, Duration::from_millis(150), 40.0..=70.0)
    }

    pub fn range(&self) -> &RangeInclusive<f64> {
        &self.range
    }
}

#[async_trait]
impl MetricSource for SimulatedMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_value(&self) -> f64 {
        self.reading.read().value
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.reading.read().updated_at
    }

    async fn refresh(&self, cancel: &CancelSignal) -> Result<(), RefreshError> {
        if !cancel.sleep(self.latency).await {
            return Err(RefreshError::Cancelled);
        }

        let sample = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.range.clone())
        };

        *self.reading.write() = Reading {
            value: clamp_percent(sample),
            updated_at: Some(Utc::now()),
        };
        Ok(())
    }
}
