// tests/rate_limit_test.rs

use flickr_dl::{
    error::AppError,
    remote::rate_limit::{RateLimitedCaller, RemoteError, RetryPolicy},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(50),
        max_backoff: Duration::from_millis(500),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_rate_limited_call_backs_off_and_succeeds() {
    let caller = RateLimitedCaller::new(fast_policy(5), Duration::ZERO);
    let calls = AtomicUsize::new(0);

    let start = Instant::now();
    let value = caller
        .call("flickr.test.busy", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(RemoteError::RateLimited("code 105".into()))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 50ms + 100ms
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_network_error_uses_larger_multiplier() {
    let caller = RateLimitedCaller::new(fast_policy(5), Duration::ZERO);
    let calls = AtomicUsize::new(0);

    let start = Instant::now();
    caller
        .call("flickr.test.flaky", || async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(RemoteError::Network("timeout".into())),
                1 => Err(RemoteError::RateLimited("429".into())),
                _ => Ok(()),
            }
        })
        .await
        .unwrap();

    // 50ms，然后 50 * 2.5 = 125ms
    assert!(start.elapsed() >= Duration::from_millis(175));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_attempts() {
    let caller = RateLimitedCaller::new(fast_policy(3), Duration::ZERO);
    let calls = AtomicUsize::new(0);

    let err = caller
        .call("flickr.test.down", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RemoteError::RateLimited("503".into()))
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match err {
        AppError::RetriesExhausted { method, attempts, .. } => {
            assert_eq!(method, "flickr.test.down");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let caller = RateLimitedCaller::new(fast_policy(5), Duration::ZERO);
    let calls = AtomicUsize::new(0);

    let err = caller
        .call("flickr.test.denied", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RemoteError::Fatal(AppError::Api {
                code: 98,
                message: "Invalid auth token".into(),
            }))
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, AppError::Api { code: 98, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_callers_share_one_interval() {
    let caller = Arc::new(RateLimitedCaller::new(
        fast_policy(1),
        Duration::from_millis(60),
    ));

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let caller = caller.clone();
            tokio::spawn(async move {
                caller
                    .call("flickr.test.echo", || async { Ok::<_, RemoteError>(()) })
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 四次调用之间至少有三个间隔
    assert!(start.elapsed() >= Duration::from_millis(180));
}
