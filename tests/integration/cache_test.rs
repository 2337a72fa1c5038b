// Integration tests for ExpiringCache through the public API

use parking_lot::Mutex;
use perfmon::core::cache::{ExpiringCache, RemovalReason};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test(start_paused = true)]
async fn test_each_entry_keeps_its_own_expiration() {
    let cache = ExpiringCache::new(Duration::from_millis(500), HOUR).unwrap();

    cache.add_or_update("short", 1u32, Some(Duration::from_millis(100)));
    cache.add_or_update("default", 2u32, None);
    cache.add_or_update("long", 3u32, Some(Duration::from_secs(10)));

    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(cache.try_get(&"short"), None);
    assert_eq!(cache.try_get(&"default"), Some(2));

    tokio::time::advance(Duration::from_millis(400)).await;
    assert_eq!(cache.try_get(&"default"), None);
    assert_eq!(cache.try_get(&"long"), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_replacement_restarts_expiration_window() {
    let cache = ExpiringCache::new(Duration::from_millis(100), HOUR).unwrap();

    cache.add_or_update("metric", 1u32, None);
    tokio::time::advance(Duration::from_millis(80)).await;
    cache.add_or_update("metric", 2u32, None);
    tokio::time::advance(Duration::from_millis(80)).await;

    assert_eq!(cache.try_get(&"metric"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_removal_reasons_across_lifecycle() {
    let cache = ExpiringCache::new(HOUR, Duration::from_millis(50)).unwrap();
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = reasons.clone();
    cache.subscribe_removals(move |event| sink.lock().push((event.key, event.reason)));

    cache.add_or_update("replaced", 1u32, None);
    cache.add_or_update("replaced", 2u32, None);
    cache.add_or_update("removed", 1u32, None);
    cache.remove(&"removed");
    cache.add_or_update("swept", 1u32, Some(Duration::from_millis(10)));
    tokio::time::sleep(Duration::from_millis(60)).await;
    cache.dispose();

    assert_eq!(
        reasons.lock().as_slice(),
        &[
            ("replaced", RemovalReason::Replaced),
            ("removed", RemovalReason::Removed),
            ("swept", RemovalReason::Expired),
            ("replaced", RemovalReason::Cleanup),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribed_handler_is_not_called() {
    let cache = ExpiringCache::new(HOUR, HOUR).unwrap();
    let calls = Arc::new(Mutex::new(0usize));
    let sink = calls.clone();
    let id = cache.subscribe_removals(move |_| *sink.lock() += 1);

    cache.add_or_update(1u8, "a", None);
    cache.remove(&1u8);
    assert!(cache.unsubscribe_removals(id));
    cache.add_or_update(1u8, "b", None);
    cache.remove(&1u8);

    assert_eq!(*calls.lock(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unrelated_keys_progress_concurrently() {
    let cache = Arc::new(ExpiringCache::new(HOUR, Duration::from_millis(5)).unwrap());

    let writers: Vec<_> = (0..8u32)
        .map(|worker| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..500u32 {
                    let key = worker * 1_000 + i;
                    cache.add_or_update(key, i, None);
                    assert_eq!(cache.try_get(&key), Some(i));
                    if i % 2 == 0 {
                        assert!(cache.remove(&key));
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(cache.len(), 8 * 250);
    assert_eq!(cache.values().len(), 8 * 250);
}
