use parking_lot::Mutex;
use racedata::errors::DataError;
use racedata::throttle::{Throttle, ThrottleConfig, ThrottleConfigUpdate};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn http(status: u16) -> DataError {
    DataError::Http { status, message: format!("status {status}") }
}

fn config(rate: f64, burst: f64) -> ThrottleConfig {
    ThrottleConfig {
        requests_per_second: rate,
        burst_capacity: burst,
        cooldown: None,
        max_queue_size: 100,
        max_retries: 3,
        base_retry_delay: Duration::from_millis(100),
    }
}

#[tokio::test(start_paused = true)]
async fn admissions_follow_the_configured_rate() {
    const RATE: usize = 5;
    const M: usize = 15;
    let throttle = Throttle::new("rate", config(RATE as f64, 0.0));
    let starts = Arc::new(Mutex::new(Vec::new()));
    let t0 = Instant::now();

    let mut tickets = Vec::new();
    for i in 0..M {
        let starts = starts.clone();
        tickets.push(
            throttle
                .submit(move || {
                    let starts = starts.clone();
                    async move {
                        starts.lock().push(Instant::now());
                        Ok(i)
                    }
                })
                .unwrap(),
        );
    }
    for (i, t) in tickets.into_iter().enumerate() {
        assert_eq!(t.await.unwrap(), i, "FIFO order");
    }

    // One request goes out at once, every later one waits a full token interval.
    let elapsed = t0.elapsed();
    let floor = Duration::from_secs_f64((M - 1) as f64 / RATE as f64);
    assert!(elapsed >= floor - Duration::from_millis(5), "{elapsed:?} < {floor:?}");

    let starts = starts.lock().clone();
    assert_eq!(starts.len(), M);
    let first_second = starts.iter().filter(|s| **s - t0 < Duration::from_secs(1)).count();
    assert!(first_second <= RATE, "{first_second} starts in the first second");
    for i in 0..M - RATE {
        let span = starts[i + RATE] - starts[i];
        assert!(span >= Duration::from_millis(995), "more than {RATE} starts within {span:?}");
    }
    let stats = throttle.stats();
    assert_eq!(stats.total_requests, M as u64);
    assert_eq!(stats.successful_requests, M as u64);
    assert_eq!(stats.queue_size, 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_backoff() {
    let throttle = Throttle::new("retry", config(100.0, 0.0));
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    let t0 = Instant::now();

    let value = throttle
        .execute(move || {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) < 2 { Err(http(429)) } else { Ok("done") }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // 100ms then 200ms of backoff.
    assert!(t0.elapsed() >= Duration::from_millis(300));
    let stats = throttle.stats();
    assert_eq!(stats.retried_requests, 2);
    assert_eq!(stats.successful_requests, 1);
    assert_eq!(stats.failed_requests, 0);
}

#[tokio::test(start_paused = true)]
async fn non_transient_failure_rejects_after_one_attempt() {
    let throttle = Throttle::new("fatal", config(100.0, 0.0));
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    let err = throttle
        .execute(move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(http(400))
            }
        })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(400));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    let stats = throttle.stats();
    assert_eq!((stats.retried_requests, stats.failed_requests), (0, 1));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_error() {
    let throttle = Throttle::new("exhaust", config(100.0, 0.0));
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    let err = throttle
        .execute(move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(http(503))
            }
        })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(503));
    assert_eq!(attempts.load(Ordering::SeqCst), 4, "first attempt plus three retries");
    assert_eq!(throttle.stats().retried_requests, 3);
}

#[tokio::test(start_paused = true)]
async fn full_queue_rejects_synchronously() {
    let mut cfg = config(1.0, 0.0);
    cfg.max_queue_size = 2;
    let throttle = Throttle::new("full", cfg);

    let a = throttle.submit(|| async { Ok(1) }).unwrap();
    let b = throttle.submit(|| async { Ok(2) }).unwrap();
    let rejected = throttle.submit(|| async { Ok(3) });
    assert!(matches!(rejected, Err(DataError::QueueFull { max_queue_size: 2 })));

    assert_eq!(a.await.unwrap(), 1);
    assert_eq!(b.await.unwrap(), 2);
    let stats = throttle.stats();
    assert_eq!(stats.dropped_requests, 1);
    assert_eq!(stats.successful_requests, 2);
}

#[tokio::test(start_paused = true)]
async fn clear_queue_rejects_everything_pending() {
    let throttle = Throttle::new("clear", config(1.0, 0.0));
    let tickets: Vec<_> = (0..3).map(|i| throttle.submit(move || async move { Ok(i) }).unwrap()).collect();
    assert_eq!(throttle.queue_size(), 3);
    assert_eq!(throttle.clear_queue(), 3);
    assert_eq!(throttle.queue_size(), 0);
    for t in tickets {
        assert!(matches!(t.await, Err(DataError::QueueCleared)));
    }
    assert_eq!(throttle.stats().dropped_requests, 3);
}

#[tokio::test(start_paused = true)]
async fn clear_queue_cancels_items_waiting_out_a_backoff() {
    let mut cfg = config(100.0, 0.0);
    cfg.base_retry_delay = Duration::from_secs(30);
    let throttle = Throttle::new("clear-retry", cfg);
    let ticket = throttle.submit(|| async { Err::<(), _>(http(429)) }).unwrap();
    // Let the first attempt run and enter its backoff sleep.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(throttle.stats().retried_requests, 1);
    assert_eq!(throttle.queue_size(), 0);

    let cleared_at = Instant::now();
    assert_eq!(throttle.clear_queue(), 1, "the backing-off item is counted");
    assert!(matches!(ticket.await, Err(DataError::QueueCleared)));
    assert!(cleared_at.elapsed() < Duration::from_secs(1), "rejected without waiting out the backoff");
    assert_eq!(throttle.stats().dropped_requests, 1);
}

#[tokio::test(start_paused = true)]
async fn burst_allowance_then_cooldown() {
    let mut cfg = config(2.0, 2.0);
    cfg.cooldown = Some(Duration::from_secs(1));
    let throttle = Throttle::new("burst", cfg);
    let t0 = Instant::now();

    let first: Vec<_> = (0..3).map(|i| throttle.submit(move || async move { Ok(i) }).unwrap()).collect();
    for t in first {
        t.await.unwrap();
    }
    assert!(t0.elapsed() < Duration::from_millis(50), "one regular plus two burst tokens");
    assert!(throttle.stats().in_cooldown);

    throttle.execute(|| async { Ok(()) }).await.unwrap();
    assert!(t0.elapsed() >= Duration::from_secs(1), "fourth request waits out the cooldown");
    assert!(!throttle.stats().in_cooldown);
}

#[tokio::test(start_paused = true)]
async fn config_updates_apply_to_later_admissions() {
    let throttle = Throttle::new("update", ThrottleConfig::strict());
    throttle.update_config(&ThrottleConfigUpdate {
        max_retries: Some(1),
        max_queue_size: Some(1),
        ..Default::default()
    });
    let cfg = throttle.config();
    assert_eq!(cfg.max_retries, 1);
    assert_eq!(cfg.max_queue_size, 1);
    assert_eq!(cfg.requests_per_second, 5.0);

    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    let _ = throttle
        .execute(move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DataError::Timeout("slow".into()))
            }
        })
        .await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn average_wait_reflects_queueing() {
    let throttle = Throttle::new("wait", config(1.0, 0.0));
    let tickets: Vec<_> = (0..3).map(|i| throttle.submit(move || async move { Ok(i) }).unwrap()).collect();
    for t in tickets {
        t.await.unwrap();
    }
    // Waits of 0s, 1s and 2s.
    let avg = throttle.stats().average_wait_ms;
    assert!((990.0..=1010.0).contains(&avg), "average wait {avg}");
}

#[test]
fn submit_without_runtime_is_an_error() {
    let throttle = Throttle::new("no-runtime", ThrottleConfig::standard());
    let res = throttle.submit(|| async { Ok(()) });
    assert!(matches!(res, Err(DataError::Throttle(_))));
}
