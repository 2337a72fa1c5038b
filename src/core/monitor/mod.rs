//! Metric monitor: one polling task per metric over a shared expiring cache.
//!
//! The monitor owns the cache (keyed by metric id), the polling task
//! handles and the cancel signal they all watch. `shutdown` fans the signal
//! out, waits a bounded time for every task, then disposes the cache.

mod notification;
mod polling;
mod statistics;

pub use notification::{ChangeNotification, MetricReading};
pub use statistics::{MetricStatistics, StatisticsSnapshot};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::cache::{ExpiringCache, RemovalEvent};
use crate::core::cancel::{CancelHandle, CancelSignal};
use crate::core::config::MonitorConfig;
use crate::core::events::{EventHub, SubscriptionId};
use crate::core::source::{display_name, SharedSource};
use crate::error::{PerfmonError, Result};

use polling::Poller;

/// Outcome of [`MetricMonitor::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that exited within the timeout
    pub stopped: usize,
    /// Ids whose task had to be aborted after the timeout
    pub timed_out: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty()
    }
}

pub struct MetricMonitor {
    config: MonitorConfig,
    runtime: Handle,
    cache: Arc<ExpiringCache<String, SharedSource>>,
    notifications: Arc<EventHub<ChangeNotification>>,
    cancel: CancelHandle,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl MetricMonitor {
    /// Must be called from within a Tokio runtime; polling tasks and the
    /// cache sweep are spawned on it.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        if config.poll_interval.is_zero() {
            return Err(PerfmonError::config("poll interval must be greater than zero"));
        }
        if config.refresh_timeout.is_zero() {
            return Err(PerfmonError::config("refresh timeout must be greater than zero"));
        }

        let runtime =
            Handle::try_current().map_err(|e| PerfmonError::NoRuntime(e.to_string()))?;
        let cache = ExpiringCache::new(config.default_expiration, config.sweep_interval)?;

        Ok(Self {
            config,
            runtime,
            cache: Arc::new(cache),
            notifications: Arc::new(EventHub::new("metric notification")),
            cancel: CancelHandle::new(),
            tasks: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Cache the source under `id` and start polling it.
    ///
    /// Fails if `id` still has a running task or the monitor is shut down.
    pub fn register(&self, id: impl Into<String>, source: SharedSource) -> Result<()> {
        let id = id.into();
        if self.is_shut_down() {
            return Err(PerfmonError::ShutDown);
        }

        let poller = Poller {
            id: id.clone(),
            source: Arc::clone(&source),
            cache: Arc::clone(&self.cache),
            notifications: Arc::clone(&self.notifications),
            cancel: self.cancel.signal(),
            poll_interval: self.config.poll_interval,
            error_backoff: self.config.error_backoff,
            refresh_timeout: self.config.refresh_timeout,
        };

        // Claim the id under the lock; the cache write below may call
        // removal subscribers, which are free to query the monitor.
        {
            let mut tasks = self.tasks.lock();
            if tasks.get(&id).is_some_and(|task| !task.is_finished()) {
                return Err(PerfmonError::duplicate_metric(id));
            }
            tasks.insert(id.clone(), self.runtime.spawn(poller.run()));
        }

        self.cache
            .add_or_update(id.clone(), Arc::clone(&source), None);

        log::info!("Registered metric '{}' ({})", id, display_name(source.as_ref()));
        Ok(())
    }

    /// Deliver every future [`ChangeNotification`] to `handler`.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        self.notifications.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifications.unsubscribe(id)
    }

    /// Observe cache removals (expiry, replacement on refresh, cleanup).
    pub fn subscribe_removals<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&RemovalEvent<String, SharedSource>) + Send + Sync + 'static,
    {
        self.cache.subscribe_removals(handler)
    }

    pub fn unsubscribe_removals(&self, id: SubscriptionId) -> bool {
        self.cache.unsubscribe_removals(id)
    }

    /// Aggregate the values of every live metric in one snapshot.
    pub fn get_statistics(&self) -> MetricStatistics {
        let values: Vec<f64> = self
            .cache
            .values()
            .iter()
            .map(|source| source.current_value())
            .collect();

        MetricStatistics::from_values(&values)
    }

    /// Latest reading of one metric, if it is still live in the cache.
    pub fn latest(&self, id: &str) -> Option<MetricReading> {
        let source = self.cache.try_get(&id.to_string())?;
        Some(MetricReading {
            metric_id: id.to_string(),
            metric_name: display_name(source.as_ref()),
            value: source.current_value(),
            last_updated: source.last_updated(),
        })
    }

    /// Ids of the metrics currently live in the cache, sorted.
    pub fn metric_ids(&self) -> Vec<String> {
        let mut ids = self.cache.keys();
        ids.sort();
        ids
    }

    /// Number of polling tasks that have not exited yet.
    pub fn active_tasks(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Signal for code that wants to stop together with the monitor.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.signal()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Cancel every polling task, wait up to the configured timeout for
    /// them, then dispose the cache. Later calls return an empty report.
    pub async fn shutdown(&self) -> ShutdownReport {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return ShutdownReport::default();
        }

        log::info!("Shutting down metric monitor");
        self.cancel.cancel();

        let (ids, mut handles): (Vec<String>, Vec<JoinHandle<()>>) =
            self.tasks.lock().drain().unzip();

        let joined = tokio::time::timeout(
            self.config.shutdown_timeout,
            join_all(handles.iter_mut()),
        )
        .await;

        let mut timed_out = Vec::new();
        match joined {
            Ok(results) => {
                for (id, result) in ids.iter().zip(results) {
                    if let Err(e) = result {
                        if e.is_panic() {
                            log::error!("Polling task for '{}' panicked", id);
                        }
                    }
                }
            }
            Err(_) => {
                for (id, handle) in ids.iter().zip(&handles) {
                    if !handle.is_finished() {
                        handle.abort();
                        timed_out.push(id.clone());
                    }
                }
                log::warn!(
                    "{} polling task(s) did not stop within {:?}: {}",
                    timed_out.len(),
                    self.config.shutdown_timeout,
                    timed_out.join(", ")
                );
            }
        }

        self.notifications.close();
        self.cache.dispose();

        let report = ShutdownReport {
            stopped: ids.len() - timed_out.len(),
            timed_out,
        };
        log::info!("Metric monitor stopped ({} task(s))", report.stopped);
        report
    }
}

impl Drop for MetricMonitor {
    fn drop(&mut self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
        self.notifications.close();
        self.cache.dispose();
    }
}
