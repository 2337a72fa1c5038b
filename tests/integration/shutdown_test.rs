// Integration tests for MetricMonitor shutdown and cancellation

use perfmon::core::monitor::MetricMonitor;
use perfmon::core::{MonitorConfig, SimulatedMetric};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(20),
        shutdown_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

fn count_notifications(monitor: &MetricMonitor) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = count.clone();
    monitor.subscribe(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[tokio::test(start_paused = true)]
async fn test_no_notifications_after_shutdown() {
    let monitor = MetricMonitor::new(config()).unwrap();
    let count = count_notifications(&monitor);

    monitor
        .register("cpu", Arc::new(SimulatedMetric::new("CPU", Duration::from_millis(5), 20.0..=80.0)))
        .unwrap();
    monitor
        .register("mem", Arc::new(SimulatedMetric::new("Memory", Duration::from_millis(7), 40.0..=70.0)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let report = monitor.shutdown().await;
    assert!(report.is_clean());
    assert_eq!(report.stopped, 2);

    let at_shutdown = count.load(Ordering::SeqCst);
    assert!(at_shutdown > 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count.load(Ordering::SeqCst), at_shutdown);
    assert_eq!(monitor.active_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_refresh_never_publishes() {
    let monitor = MetricMonitor::new(config()).unwrap();
    let count = count_notifications(&monitor);

    // First refresh is still in flight when shutdown starts
    monitor
        .register("slow", Arc::new(SimulatedMetric::new("Slow", Duration::from_secs(1), 0.0..=100.0)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = monitor.shutdown().await;
    assert!(report.is_clean());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_without_shutdown_stops_polling() {
    let count;
    {
        let monitor = MetricMonitor::new(config()).unwrap();
        count = count_notifications(&monitor);
        monitor
            .register("cpu", Arc::new(SimulatedMetric::new("CPU", Duration::ZERO, 20.0..=80.0)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let after_drop = count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count.load(Ordering::SeqCst), after_drop);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_is_bounded_when_a_task_is_stuck() {
    let monitor = MetricMonitor::new(MonitorConfig {
        shutdown_timeout: Duration::from_millis(50),
        ..config()
    })
    .unwrap();

    let entered = Arc::new(AtomicBool::new(false));
    let flag = entered.clone();
    monitor.subscribe(move |_| {
        flag.store(true, Ordering::SeqCst);
        // Blocks the polling task well past the shutdown timeout
        std::thread::sleep(Duration::from_millis(400));
    });

    monitor
        .register("stuck", Arc::new(SimulatedMetric::new("Stuck", Duration::ZERO, 10.0..=20.0)))
        .unwrap();

    while !entered.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    let report = monitor.shutdown().await;

    assert!(started.elapsed() < Duration::from_millis(350));
    assert!(!report.is_clean());
    assert_eq!(report.timed_out, vec!["stuck".to_string()]);
    assert_eq!(report.stopped, 0);
    assert!(monitor.get_statistics().is_empty());
}
