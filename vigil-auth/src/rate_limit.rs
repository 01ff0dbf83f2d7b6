//! Fixed-window rate limiting over the relational store
//!
//! One row per limiter key. The window resets wholesale when it elapses, so
//! bursts across a window boundary can briefly exceed the configured rate;
//! that tradeoff buys a single-statement increment path. Two concurrent
//! first requests for one key may both be admitted when the insert race is
//! lost; the unique key column guarantees the stored count itself is never
//! corrupted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use vigil_interfaces::RepositoryFactory;

use crate::error::AuthResult;

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the current window ends and the counter starts over
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, for the `Retry-After` header
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.reset_at - now).num_seconds().max(0)
    }
}

/// Fixed-window request counter keyed by an arbitrary string
#[derive(Clone)]
pub struct RateLimiter {
    repositories: Arc<dyn RepositoryFactory>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(repositories: Arc<dyn RepositoryFactory>) -> Self {
        Self { repositories }
    }

    /// Admit or deny one request against the key's current window
    pub async fn check(&self, key: &str, max_requests: u32, window: Duration) -> AuthResult<RateLimitDecision> {
        let repo = self.repositories.rate_limit_repository();
        let now = Utc::now();

        let Some(current) = repo.fetch(key).await? else {
            // A lost insert race still admits this request; the window
            // over-admits by at most one.
            repo.create_window(key, now).await?;
            return Ok(RateLimitDecision {
                allowed: true,
                limit: max_requests,
                remaining: max_requests.saturating_sub(1),
                reset_at: now + window,
            });
        };

        let window_end = current.window_start + window;
        if now >= window_end {
            repo.reset_window(key, now).await?;
            return Ok(RateLimitDecision {
                allowed: true,
                limit: max_requests,
                remaining: max_requests.saturating_sub(1),
                reset_at: now + window,
            });
        }

        if current.requests >= max_requests as i32 {
            return Ok(RateLimitDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                reset_at: window_end,
            });
        }

        repo.increment(key).await?;
        Ok(RateLimitDecision {
            allowed: true,
            limit: max_requests,
            remaining: max_requests.saturating_sub(current.requests as u32 + 1),
            reset_at: window_end,
        })
    }
}
