//! Token bucket limiting outbound requests of a single adapter.
//!
//! Each adapter owns one bucket. Mock mode never touches it, since nothing
//! leaves the process.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
    /// Refill rate in tokens per second.
    rate: f64,
    capacity: f64,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }
}

pub struct TokenBucket {
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    /// Bucket allowing `requests_per_minute` sustained, bursting up to a
    /// sixth of that.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1) as f64;
        let capacity = (rpm / 6.0).max(1.0);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_update: Instant::now(),
                rate: rpm / 60.0,
                capacity,
            }),
        }
    }

    /// Lock the bucket, recovering from poison. A poisoned bucket only means
    /// slightly wrong limiting, never corrupt data.
    fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Adapter rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Takes a token if one is available.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        bucket.refill();
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token is available.
    pub fn time_until_available(&self) -> Duration {
        let mut bucket = self.lock();
        bucket.refill();
        if bucket.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - bucket.tokens) / bucket.rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_exhausted() {
        let bucket = TokenBucket::per_minute(60);
        // capacity is 10 for 60 rpm
        for _ in 0..10 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
        assert!(bucket.time_until_available() > Duration::ZERO);
    }

    #[test]
    fn test_tiny_budget_still_allows_one_request() {
        let bucket = TokenBucket::per_minute(1);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }
}
