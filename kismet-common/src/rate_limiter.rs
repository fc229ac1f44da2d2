// SPDX-License-Identifier: Apache-2.0

//! Token-bucket rate limiter, used to cap noisy per-device error counters
//! (spec.md §7: "a per-phy counter tracks rate") and retry backoff pacing.
//!
//! <div class="warning">Not thread-safe; wrap in a <code>Mutex</code> if
//! shared.</div>

use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn duration_since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    capacity: f64,
    interval: Duration,
    tokens: f64,
    last_update: Duration,
}

impl TokenBucketRateLimiter {
    /// `capacity` tokens are available per `interval`.
    pub fn new(capacity: f64, interval: Duration) -> Self {
        TokenBucketRateLimiter {
            capacity,
            interval,
            tokens: capacity,
            last_update: duration_since_epoch(),
        }
    }

    fn refill(&mut self) {
        let now = duration_since_epoch();
        let elapsed = now.saturating_sub(self.last_update).as_secs_f64();
        let rate = self.capacity / self.interval.as_secs_f64().max(f64::EPSILON);
        self.tokens = (self.tokens + elapsed * rate).min(self.capacity);
        self.last_update = now;
    }

    /// Returns `true` and consumes a token if one is available.
    pub fn is_allowed(&mut self) -> bool {
        if self.capacity < 0.0 {
            return true;
        }
        if self.capacity == 0.0 {
            return false;
        }
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_then_refuses() {
        let mut limiter = TokenBucketRateLimiter::new(2.0, Duration::from_secs(60));
        assert!(limiter.is_allowed());
        assert!(limiter.is_allowed());
        assert!(!limiter.is_allowed());
    }

    #[test]
    fn zero_capacity_always_denies() {
        let mut limiter = TokenBucketRateLimiter::new(0.0, Duration::from_secs(1));
        assert!(!limiter.is_allowed());
    }

    #[test]
    fn negative_capacity_always_allows() {
        let mut limiter = TokenBucketRateLimiter::new(-1.0, Duration::from_secs(1));
        for _ in 0..10 {
            assert!(limiter.is_allowed());
        }
    }
}
