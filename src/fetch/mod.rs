//! Rate-limited, cache-backed fetcher.
//!
//! Every outbound request a [`Fetcher`] issues goes through one [`Throttle`],
//! so all stages of a run share a single request clock. Cache hits bypass the
//! throttle entirely.

pub mod backoff;
pub mod throttle;
pub mod transport;

pub use backoff::{Backoff, BackoffStep};
pub use throttle::{Throttle, ThrottlePermit};
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};

use crate::cache::{CacheEntry, RequestCache};
use crate::config::{PipelineConfig, RetryConfig};
use crate::errors::{is_retryable_status, CacheWriteError, FetchError};
use crate::signature::RequestSignature;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fetched document and how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub entry: CacheEntry,
    pub from_cache: bool,
    /// Network attempts made; zero for a cache hit.
    pub attempts: u32,
    /// Set when the document was fetched but could not be cached.
    pub cache_write_error: Option<CacheWriteError>,
}

impl FetchOutcome {
    pub fn body(&self) -> &str {
        &self.entry.body
    }
}

#[derive(Debug, Default)]
struct FetchCounters {
    network_requests: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    cache_write_failures: AtomicU64,
}

/// Point-in-time copy of a fetcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub network_requests: u64,
    pub cache_hits: u64,
    pub retries: u64,
    pub failures: u64,
    pub cache_write_failures: u64,
}

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn RequestCache>,
    throttle: Throttle,
    retry: RetryConfig,
    counters: FetchCounters,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("throttle", &self.throttle)
            .field("retry", &self.retry)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn RequestCache>,
        min_interval: Duration,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            throttle: Throttle::new(min_interval),
            retry,
            counters: FetchCounters::default(),
        }
    }

    /// Fetcher over HTTP with settings from `config`.
    pub fn from_config(
        config: &PipelineConfig,
        cache: Arc<dyn RequestCache>,
    ) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.user_agent, config.request_timeout())?;
        Ok(Self::new(
            Arc::new(transport),
            cache,
            config.throttle.min_interval(),
            config.retry.clone(),
        ))
    }

    pub fn cache(&self) -> &Arc<dyn RequestCache> {
        &self.cache
    }

    pub fn stats(&self) -> FetchStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        FetchStats {
            network_requests: load(&self.counters.network_requests),
            cache_hits: load(&self.counters.cache_hits),
            retries: load(&self.counters.retries),
            failures: load(&self.counters.failures),
            cache_write_failures: load(&self.counters.cache_write_failures),
        }
    }

    /// The stage's own partition first, then any other partition that already
    /// holds the page. Read faults count as misses.
    fn lookup(&self, partition: &str, signature: &RequestSignature) -> Option<CacheEntry> {
        match self.cache.get(partition, signature) {
            Ok(Some(entry)) => {
                log::debug!("[CACHED] {}", signature);
                return Some(entry);
            }
            Ok(None) => {}
            Err(e) => log::warn!("{}; trying other partitions for {}", e, signature),
        }
        match self.cache.find_elsewhere(partition, signature) {
            Ok(Some((owner, entry))) => {
                log::debug!("[CACHED:{}] {}", owner, signature);
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("{}; fetching {} from the network", e, signature);
                None
            }
        }
    }

    /// Return the document for `signature`, from `partition` of the cache
    /// unless `force_refresh` is set.
    pub fn fetch(
        &self,
        partition: &str,
        signature: &RequestSignature,
        force_refresh: bool,
    ) -> Result<FetchOutcome, FetchError> {
        if !force_refresh {
            if let Some(entry) = self.lookup(partition, signature) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(FetchOutcome {
                    entry,
                    from_cache: true,
                    attempts: 0,
                    cache_write_error: None,
                });
            }
        }

        let mut backoff = Backoff::new(&self.retry);
        let mut last_status = None;

        loop {
            let attempt = backoff.begin_attempt();
            let result = {
                let _permit = self.throttle.acquire();
                log::info!("Fetching {}", signature);
                self.counters
                    .network_requests
                    .fetch_add(1, Ordering::Relaxed);
                self.transport.send(signature)
            };

            let (reason, retry_after) = match result {
                Ok(response) if response.is_success() => {
                    return Ok(self.store(partition, signature, response, attempt));
                }
                Ok(response) if is_retryable_status(response.status) => {
                    last_status = Some(response.status);
                    (format!("HTTP {}", response.status), response.retry_after)
                }
                Ok(response) => {
                    log::error!("HTTP {} for {}", response.status, signature);
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(FetchError {
                        signature: signature.clone(),
                        last_status: Some(response.status),
                        attempts: attempt,
                        reason: format!("HTTP {}", response.status),
                    });
                }
                Err(e) => (e.message, None),
            };

            match backoff.on_retryable_failure(retry_after) {
                BackoffStep::Retry {
                    attempt: next,
                    delay,
                } => {
                    log::warn!(
                        "{} for {}; retrying in {:?} (attempt {}/{})",
                        reason,
                        signature,
                        delay,
                        next,
                        self.retry.max_attempts()
                    );
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(delay);
                }
                BackoffStep::Exhausted { attempts } => {
                    log::error!(
                        "Giving up on {} after {} attempt(s): {}",
                        signature,
                        attempts,
                        reason
                    );
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(FetchError {
                        signature: signature.clone(),
                        last_status,
                        attempts,
                        reason,
                    });
                }
            }
        }
    }

    /// Best-effort write-through.
    fn store(
        &self,
        partition: &str,
        signature: &RequestSignature,
        response: RawResponse,
        attempts: u32,
    ) -> FetchOutcome {
        let entry = CacheEntry::new(signature.clone(), response.body, response.status, Utc::now())
            .with_encoding(response.content_encoding);

        let cache_write_error = match self.cache.put(partition, entry.clone()) {
            Ok(_) => None,
            Err(e) => {
                log::warn!("{}", e);
                self.counters
                    .cache_write_failures
                    .fetch_add(1, Ordering::Relaxed);
                Some(e)
            }
        };

        FetchOutcome {
            entry,
            from_cache: false,
            attempts,
            cache_write_error,
        }
    }
}
