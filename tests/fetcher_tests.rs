use pitchcrawl::cache::{MemoryRequestCache, RequestCache};
use pitchcrawl::config::{RetryConfig, RetryStrategy};
use pitchcrawl::fetch::{Fetcher, RawResponse};
use pitchcrawl::signature::RequestSignature;
use pitchcrawl::testkit::{FailingRequestCache, ScriptedTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn url(n: usize) -> String {
    format!("https://fbref.com/en/comps/{}/history/Comp-{}-Seasons", n, n)
}

#[test]
fn test_requests_are_spaced_by_min_interval() {
    let mut transport = ScriptedTransport::new();
    for n in 0..4 {
        transport = transport.with_page(&url(n), "ok");
    }
    let transport = Arc::new(transport);
    let interval = Duration::from_millis(40);
    let fetcher = Fetcher::new(
        transport.clone(),
        Arc::new(MemoryRequestCache::new()),
        interval,
        RetryConfig::disabled(),
    );

    let start = Instant::now();
    for n in 0..4 {
        let sig = RequestSignature::parse(&url(n)).unwrap();
        fetcher.fetch("season", &sig, false).unwrap();
    }

    assert!(start.elapsed() >= interval * 3, "{:?}", start.elapsed());
    assert_eq!(fetcher.stats().network_requests, 4);
}

#[test]
fn test_cache_hits_skip_the_throttle() {
    let transport = Arc::new(ScriptedTransport::new().with_page(&url(1), "ok"));
    let fetcher = Fetcher::new(
        transport.clone(),
        Arc::new(MemoryRequestCache::new()),
        Duration::from_millis(200),
        RetryConfig::disabled(),
    );
    let sig = RequestSignature::parse(&url(1)).unwrap();
    fetcher.fetch("season", &sig, false).unwrap();

    let start = Instant::now();
    for _ in 0..5 {
        assert!(fetcher.fetch("season", &sig, false).unwrap().from_cache);
    }

    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(transport.total_requests(), 1);
}

#[test]
fn test_throttle_is_shared_across_threads() {
    let mut transport = ScriptedTransport::new();
    for n in 0..4 {
        transport = transport.with_page(&url(n), "ok");
    }
    let interval = Duration::from_millis(30);
    let fetcher = Arc::new(Fetcher::new(
        Arc::new(transport),
        Arc::new(MemoryRequestCache::new()),
        interval,
        RetryConfig::disabled(),
    ));

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let fetcher = fetcher.clone();
            std::thread::spawn(move || {
                let sig = RequestSignature::parse(&url(n)).unwrap();
                fetcher.fetch("season", &sig, false).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(start.elapsed() >= interval * 3, "{:?}", start.elapsed());
}

#[test]
fn test_cache_write_failure_still_returns_document() {
    let transport = Arc::new(ScriptedTransport::new().with_page(&url(1), "<html>fresh</html>"));
    let fetcher = Fetcher::new(
        transport.clone(),
        Arc::new(FailingRequestCache::new()),
        Duration::ZERO,
        RetryConfig::disabled(),
    );
    let sig = RequestSignature::parse(&url(1)).unwrap();

    let outcome = fetcher.fetch("season", &sig, false).unwrap();

    assert_eq!(outcome.body(), "<html>fresh</html>");
    assert!(outcome.cache_write_error.is_some());
    assert_eq!(fetcher.stats().cache_write_failures, 1);

    // Nothing was cached, so the next call goes to the network again.
    fetcher.fetch("season", &sig, false).unwrap();
    assert_eq!(transport.request_count(&url(1)), 2);
}

#[test]
fn test_retry_after_header_is_honored() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(
                &url(1),
                RawResponse {
                    retry_after: Some(Duration::from_millis(60)),
                    ..RawResponse::with_status(429, "")
                },
            )
            .with_page(&url(1), "ok"),
    );
    let fetcher = Fetcher::new(
        transport.clone(),
        Arc::new(MemoryRequestCache::new()),
        Duration::ZERO,
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            strategy: RetryStrategy::Constant,
            max_delay_ms: 1_000,
            jitter_factor: 0.0,
        },
    );
    let sig = RequestSignature::parse(&url(1)).unwrap();

    let start = Instant::now();
    let outcome = fetcher.fetch("season", &sig, false).unwrap();

    assert_eq!(outcome.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[test]
fn test_page_is_fetched_once_across_partitions() {
    let transport = Arc::new(ScriptedTransport::new().with_page(&url(1), "ok"));
    let cache = Arc::new(MemoryRequestCache::new());
    let fetcher = Fetcher::new(
        transport.clone(),
        cache.clone(),
        Duration::ZERO,
        RetryConfig::disabled(),
    );
    let sig = RequestSignature::parse(&url(1)).unwrap();

    let first = fetcher.fetch("score_table", &sig, false).unwrap();
    let second = fetcher.fetch("fixture", &sig, false).unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(transport.request_count(&url(1)), 1);
    assert_eq!(fetcher.stats().cache_hits, 1);
    // Stored once, under the stage that fetched it.
    assert!(cache.has("score_table", &sig));
    assert!(!cache.has("fixture", &sig));
}

#[test]
fn test_clearing_owner_partition_forces_refetch() {
    let transport = Arc::new(ScriptedTransport::new().with_page(&url(1), "ok"));
    let cache = Arc::new(MemoryRequestCache::new());
    let fetcher = Fetcher::new(
        transport.clone(),
        cache.clone(),
        Duration::ZERO,
        RetryConfig::disabled(),
    );
    let sig = RequestSignature::parse(&url(1)).unwrap();

    fetcher.fetch("score_table", &sig, false).unwrap();
    cache.clear("score_table", None).unwrap();
    let refetched = fetcher.fetch("fixture", &sig, false).unwrap();

    assert!(!refetched.from_cache);
    assert_eq!(transport.request_count(&url(1)), 2);
    assert!(cache.has("fixture", &sig));
}
