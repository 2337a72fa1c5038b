use chrono::{DateTime, Utc};
use serde::Serialize;

/// Emitted once per successful refresh of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeNotification {
    pub metric_id: String,
    pub metric_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl ChangeNotification {
    pub fn new(metric_id: impl Into<String>, metric_name: impl Into<String>, value: f64) -> Self {
        Self {
            metric_id: metric_id.into(),
            metric_name: metric_name.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Point-in-time view of one registered metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub metric_id: String,
    pub metric_name: String,
    pub value: f64,
    pub last_updated: Option<DateTime<Utc>>,
}
