use chrono::{DateTime, Local};
use serde::Serialize;

/// Aggregate over the metrics currently held in the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricStatistics {
    /// No live metric in the cache
    NoData,
    Snapshot(StatisticsSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub timestamp: DateTime<Local>,
    pub total_metrics: usize,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

impl MetricStatistics {
    /// Aggregate one snapshot of values. Every field is derived from the
    /// same slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return MetricStatistics::NoData;
        }

        let (sum, max, min) = values.iter().fold(
            (0.0, f64::NEG_INFINITY, f64::INFINITY),
            |(sum, max, min), &value| (sum + value, max.max(value), min.min(value)),
        );

        MetricStatistics::Snapshot(StatisticsSnapshot {
            timestamp: Local::now(),
            total_metrics: values.len(),
            average: sum / values.len() as f64,
            max,
            min,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MetricStatistics::NoData)
    }

    pub fn snapshot(&self) -> Option<&StatisticsSnapshot> {
        match self {
            MetricStatistics::NoData => None,
            MetricStatistics::Snapshot(snapshot) => Some(snapshot),
        }
    }
}
