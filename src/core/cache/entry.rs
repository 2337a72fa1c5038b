use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// A cached value with its own, fixed expiration window.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    inserted_at: Instant,
    expiration: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, expiration: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            expiration,
        }
    }

    /// `None` when the window runs past what `Instant` can represent; such
    /// an entry never expires.
    #[inline]
    fn deadline(&self) -> Option<Instant> {
        self.inserted_at.checked_add(self.expiration)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.deadline()
            .is_some_and(|deadline| Instant::now() > deadline)
    }

    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Time left before the entry stops being visible to readers.
    pub fn time_remaining(&self) -> Duration {
        match self.deadline() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }
}

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RemovalReason {
    /// Found expired by a lookup or by the background sweep
    Expired,
    /// Explicit `remove`
    Removed,
    /// Overwritten by `add_or_update`; the new value is already visible
    Replaced,
    /// Dropped by `clear` or by disposing the cache
    Cleanup,
}

/// Event delivered to removal subscribers.
#[derive(Debug, Clone)]
pub struct RemovalEvent<K, V> {
    pub key: K,
    pub value: V,
    pub reason: RemovalReason,
}
