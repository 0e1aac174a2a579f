//! Ingestion admission control.
//!
//! Token bucket per `project:session` key. The gateway checks a bucket
//! before validating a write; an empty bucket answers 429 with a
//! Retry-After hint instead of queueing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::{Error, RateLimitErrorCode};

/// Token bucket rate limiter keyed by project and session.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

#[derive(Clone)]
pub struct RateLimitConfig {
    /// Sustained events per second per key.
    pub rate: u32,
    /// Burst capacity per key.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { rate: 50, burst: 200 }
    }
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(burst: u32) -> Self {
        Self {
            tokens: burst as f64,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, rate: u32, burst: u32, cost: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        self.tokens = (self.tokens + elapsed * rate as f64).min(burst as f64);

        if self.tokens >= cost as f64 {
            self.tokens -= cost as f64;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Bucket key for a project/session pair.
    pub fn key(project_id: &str, session_id: &str) -> String {
        format!("{}:{}", project_id, session_id)
    }

    /// Check if one event is admitted for the given key.
    pub fn check(&self, key: &str) -> bool {
        self.check_n(key, 1)
    }

    /// Check if `cost` events are admitted for the given key.
    /// Batches spend one token per event so they cannot dodge the limit.
    pub fn check_n(&self, key: &str, cost: u32) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst));

        bucket.try_acquire(self.config.rate, self.config.burst, cost)
    }

    /// Admit or answer the coded 429 with a retry hint.
    pub fn admit(&self, project_id: &str, session_id: &str, cost: u32) -> Result<(), Error> {
        if self.check_n(&Self::key(project_id, session_id), cost) {
            return Ok(());
        }
        let retry_after = (cost as u64).div_ceil(self.config.rate.max(1) as u64).max(1);
        Err(Error::rate_limit(
            RateLimitErrorCode::Exceeded,
            "Event rate limit exceeded for this session",
            Some(retry_after),
        ))
    }

    /// Drop buckets that have not been touched within `max_age`.
    pub fn cleanup_stale(&self, max_age: Duration) {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;
