//! Per-metric polling task.
//!
//! Each registered metric gets one task running refresh -> publish ->
//! notify -> wait, strictly in that order. Every suspension point races the
//! shared cancel signal; a cancelled refresh never publishes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;

use crate::core::cache::ExpiringCache;
use crate::core::cancel::CancelSignal;
use crate::core::events::{panic_message, EventHub};
use crate::core::source::{display_name, SharedSource};
use crate::error::RefreshError;

use super::notification::ChangeNotification;

/// Everything one polling task needs, moved into the task on spawn.
pub(super) struct Poller {
    pub id: String,
    pub source: SharedSource,
    pub cache: Arc<ExpiringCache<String, SharedSource>>,
    pub notifications: Arc<EventHub<ChangeNotification>>,
    pub cancel: CancelSignal,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub refresh_timeout: Duration,
}

impl Poller {
    /// Runs until cancelled. Refresh failures never end the loop.
    pub async fn run(self) {
        log::debug!("Polling task for '{}' started", self.id);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let wait = match self.refresh().await {
                Ok(()) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    self.publish();
                    self.poll_interval
                }
                Err(RefreshError::Cancelled) => break,
                Err(e) => {
                    log::warn!(
                        "Refresh of metric '{}' failed, retrying in {:?}: {}",
                        self.id,
                        self.error_backoff,
                        e
                    );
                    self.error_backoff
                }
            };

            if !self.cancel.sleep(wait).await {
                break;
            }
        }

        log::debug!("Polling task for '{}' stopped", self.id);
    }

    async fn refresh(&self) -> Result<(), RefreshError> {
        // A panicking source is a failed refresh, not a dead task
        let guarded = async {
            match AssertUnwindSafe(self.source.refresh(&self.cancel))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => Err(RefreshError::Panicked(panic_message(payload.as_ref()))),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RefreshError::Cancelled),
            result = tokio::time::timeout(self.refresh_timeout, guarded) => {
                result.unwrap_or(Err(RefreshError::Timeout(self.refresh_timeout)))
            }
        }
    }

    /// Re-insert the source (resetting its expiration window), then notify.
    fn publish(&self) {
        self.cache
            .add_or_update(self.id.clone(), Arc::clone(&self.source), None);

        let notification = ChangeNotification::new(
            self.id.as_str(),
            display_name(self.source.as_ref()),
            self.source.current_value(),
        );
        log::trace!(
            "Metric '{}' refreshed: {:.1}",
            notification.metric_id,
            notification.value
        );
        self.notifications.emit(&notification);
    }
}
