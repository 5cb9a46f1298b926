//! Minimum-interval throttle shared by every request a fetcher issues.

use parking_lot::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Enforces a minimum gap between the end of one outbound request and the
/// start of the next. Holding a [`ThrottlePermit`] serializes callers.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_finished: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until a request may start. The request counts as finished when
    /// the returned permit is dropped.
    pub fn acquire(&self) -> ThrottlePermit<'_> {
        let guard = self.last_finished.lock();
        let mut waited = Duration::ZERO;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                log::trace!("Throttle: waiting {:?}", waited);
                std::thread::sleep(waited);
            }
        }
        ThrottlePermit { guard, waited }
    }
}

/// Exclusive right to issue one request.
pub struct ThrottlePermit<'a> {
    guard: MutexGuard<'a, Option<Instant>>,
    waited: Duration,
}

impl ThrottlePermit<'_> {
    /// Time spent blocked before the permit was granted.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
    }
}
