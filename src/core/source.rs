//! Capability implemented by anything the monitor can poll.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::cancel::CancelSignal;
use crate::error::RefreshError;

/// Display name used when a source reports an empty name.
pub const UNKNOWN_METRIC_NAME: &str = "Unknown";

/// A bounded numeric metric that can refresh itself asynchronously.
///
/// Implementations keep their own state behind interior mutability;
/// the monitor only ever holds shared references.
#[async_trait]
pub trait MetricSource: Send + Sync {
    fn name(&self) -> &str;

    /// Latest value, always within `[0, 100]`.
    fn current_value(&self) -> f64;

    /// `None` until the first successful refresh.
    fn last_updated(&self) -> Option<DateTime<Utc>>;

    /// Sample the underlying quantity.
    ///
    /// Should return [`RefreshError::Cancelled`] promptly once `cancel` fires.
    async fn refresh(&self, cancel: &CancelSignal) -> Result<(), RefreshError>;
}

/// Shared handle to a metric source, as stored in the monitor's cache.
pub type SharedSource = Arc<dyn MetricSource>;

/// Clamp a raw reading into the `[0, 100]` range. NaN maps to 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Name to show for `source`, substituting [`UNKNOWN_METRIC_NAME`] for blanks.
pub fn display_name(source: &dyn MetricSource) -> String {
    let name = source.name().trim();
    if name.is_empty() {
        UNKNOWN_METRIC_NAME.to_string()
    } else {
        name.to_string()
    }
}
