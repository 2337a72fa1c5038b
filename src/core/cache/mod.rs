//! Thread-safe cache whose entries expire independently.
//!
//! Entries live in a sharded [`DashMap`], so operations on unrelated keys
//! never wait on each other. Expired entries are hidden from every read,
//! evicted lazily by `try_get`, and reclaimed proactively by a background
//! sweep task that runs on the Tokio runtime the cache was created on.

mod entry;

pub use entry::{CacheEntry, RemovalEvent, RemovalReason};

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::events::{EventHub, SubscriptionId};
use crate::error::{PerfmonError, Result};

/// Concurrent key-value store with per-entry expiration and a periodic sweep.
pub struct ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<CacheInner<K, V>>,
    shutdown_tx: watch::Sender<bool>,
    sweep_handle: Mutex<Option<JoinHandle<()>>>,
}

struct CacheInner<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    default_expiration: Duration,
    removals: EventHub<RemovalEvent<K, V>>,
    disposed: AtomicBool,
    /// Held for the duration of one sweep pass; `dispose` takes it to wait
    /// out a pass that is already running.
    sweep_lock: Mutex<()>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache and start its sweep task on the current Tokio runtime.
    pub fn new(default_expiration: Duration, sweep_interval: Duration) -> Result<Self> {
        if sweep_interval.is_zero() {
            return Err(PerfmonError::config("sweep interval must be greater than zero"));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PerfmonError::NoRuntime(e.to_string()))?;

        let inner = Arc::new(CacheInner {
            entries: DashMap::new(),
            default_expiration,
            removals: EventHub::new("cache removal"),
            disposed: AtomicBool::new(false),
            sweep_lock: Mutex::new(()),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(sweep_task(
            Arc::downgrade(&inner),
            sweep_interval,
            shutdown_rx,
        ));

        log::debug!(
            "Expiring cache created (default expiration {:?}, sweep every {:?})",
            default_expiration,
            sweep_interval
        );

        Ok(Self {
            inner,
            shutdown_tx,
            sweep_handle: Mutex::new(Some(handle)),
        })
    }

    pub fn default_expiration(&self) -> Duration {
        self.inner.default_expiration
    }

    /// Insert `value`, or atomically replace the current entry for `key`.
    ///
    /// `None` applies the default expiration. A replaced value is reported
    /// with [`RemovalReason::Replaced`] once the new value is readable.
    pub fn add_or_update(&self, key: K, value: V, expiration: Option<Duration>) {
        let expiration = expiration.unwrap_or(self.inner.default_expiration);
        let entry = CacheEntry::new(value, expiration);

        if let Some(old) = self.inner.entries.insert(key.clone(), entry) {
            self.inner.notify(key, old.value, RemovalReason::Replaced);
        }
    }

    /// Look up a live value. An expired entry is evicted on the way out.
    pub fn try_get(&self, key: &K) -> Option<V> {
        let expired = match self.inner.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.inner.evict_if_expired(key);
        }
        None
    }

    /// Read-only check; does not evict.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Snapshot of the keys of live entries. Does not evict.
    pub fn keys(&self) -> Vec<K> {
        self.inner
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Snapshot of the live values. Does not evict.
    pub fn values(&self) -> Vec<V> {
        self.inner
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| entry.value().value.clone())
            .collect()
    }

    /// Remove `key`, returning whether an entry was present.
    pub fn remove(&self, key: &K) -> bool {
        match self.inner.entries.remove(key) {
            Some((key, entry)) => {
                self.inner.notify(key, entry.value, RemovalReason::Removed);
                true
            }
            None => false,
        }
    }

    /// Drop every entry, reporting each with [`RemovalReason::Cleanup`].
    pub fn clear(&self) -> usize {
        self.inner.drain()
    }

    /// Resident entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn subscribe_removals<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&RemovalEvent<K, V>) + Send + Sync + 'static,
    {
        self.inner.removals.subscribe(handler)
    }

    pub fn unsubscribe_removals(&self, id: SubscriptionId) -> bool {
        self.inner.removals.unsubscribe(id)
    }

    /// Run one sweep pass now. Returns the number of evicted entries.
    pub fn sweep_now(&self) -> usize {
        self.inner.sweep().unwrap_or(0)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Stop the sweep and release every entry. Safe to call more than once.
    ///
    /// No sweep pass begins after this returns.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(true);

        // Wait for a pass that is mid-flight
        drop(self.inner.sweep_lock.lock());

        if let Some(handle) = self.sweep_handle.lock().take() {
            handle.abort();
        }

        let released = self.inner.drain();
        log::debug!("Expiring cache disposed ({} entries released)", released);
    }
}

impl<K, V> Drop for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn notify(&self, key: K, value: V, reason: RemovalReason) {
        self.removals.emit(&RemovalEvent { key, value, reason });
    }

    /// Remove `key` only if the resident entry is still expired, so a
    /// concurrent replacement is never lost.
    fn evict_if_expired(&self, key: &K) -> bool {
        match self.entries.remove_if(key, |_, entry| entry.is_expired()) {
            Some((key, entry)) => {
                self.notify(key, entry.value, RemovalReason::Expired);
                true
            }
            None => false,
        }
    }

    /// One sweep pass. `None` once the cache is disposed.
    fn sweep(&self) -> Option<usize> {
        let evicted = {
            let _guard = self.sweep_lock.lock();
            if self.disposed.load(Ordering::SeqCst) {
                return None;
            }

            let expired: Vec<K> = self
                .entries
                .iter()
                .filter(|entry| entry.value().is_expired())
                .map(|entry| entry.key().clone())
                .collect();

            expired
                .into_iter()
                .filter_map(|key| self.entries.remove_if(&key, |_, entry| entry.is_expired()))
                .collect::<Vec<_>>()
        };

        let count = evicted.len();
        for (key, entry) in evicted {
            self.notify(key, entry.value, RemovalReason::Expired);
        }

        if count > 0 {
            log::debug!("Cache sweep evicted {} expired entries", count);
        }
        Some(count)
    }

    fn drain(&self) -> usize {
        let keys: Vec<K> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        let mut released = 0;
        for key in keys {
            if let Some((key, entry)) = self.entries.remove(&key) {
                self.notify(key, entry.value, RemovalReason::Cleanup);
                released += 1;
            }
        }
        released
    }
}

/// Periodic sweep. Passes run back to back on this one task, so two passes
/// never overlap; late ticks are skipped rather than queued.
async fn sweep_task<K, V>(
    inner: Weak<CacheInner<K, V>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if inner.sweep().is_none() {
                    break;
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }

    log::trace!("Cache sweep task stopped");
}
