//! Token-bucket rate limiter
//!
//! Refill is computed lazily on every access; no background task runs.
//! One instance is meant to be shared (behind an `Arc`) by every caller of
//! one client configuration.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::RegistryError;
use crate::transport::cancel::CancellationToken;

#[derive(Debug)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    max_tokens: u32,
    /// Tokens added per `refill_period`
    refill_rate: u32,
    refill_period: Duration,
}

impl RateLimiter {
    /// Allow `max_requests` per `period`, starting full
    pub fn new(max_requests: u32, period: Duration) -> Self {
        Self::with_refill_rate(max_requests, max_requests, period)
    }

    /// Zero counts or a zero period are raised to the smallest usable value.
    pub fn with_refill_rate(max_tokens: u32, refill_rate: u32, refill_period: Duration) -> Self {
        let max_tokens = max_tokens.max(1);
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate: refill_rate.max(1),
            refill_period: refill_period.max(Duration::from_nanos(1)),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }

    /// Consume one token if one is available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        self.refill(&mut bucket, Instant::now());

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Wait until a token has been consumed or `cancel` fires.
    ///
    /// Waiters are not queued: several may wake for the same token and the
    /// losers simply go around again.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), RegistryError> {
        loop {
            if cancel.is_cancelled() {
                return Err(RegistryError::Cancelled);
            }
            if self.try_acquire() {
                return Ok(());
            }

            let delay = self.time_until_next_token();
            trace!(?delay, "rate limit budget exhausted, waiting for next token");

            tokio::select! {
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }

    /// Refill to capacity immediately
    pub fn reset(&self) {
        let mut bucket = self.lock();
        bucket.tokens = self.max_tokens;
        bucket.last_refill = Instant::now();
    }

    pub fn tokens_remaining(&self) -> u32 {
        let mut bucket = self.lock();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    fn lock(&self) -> MutexGuard<'_, TokenBucket> {
        // Every mutation leaves the bucket consistent, so a poisoned lock is still usable.
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refill(&self, bucket: &mut TokenBucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);

        if elapsed >= self.refill_period {
            bucket.tokens = self.max_tokens;
            bucket.last_refill = now;
            return;
        }

        let tokens_to_add =
            u128::from(self.refill_rate) * elapsed.as_nanos() / self.refill_period.as_nanos();
        if tokens_to_add > 0 {
            let refilled = u128::from(bucket.tokens) + tokens_to_add;
            bucket.tokens = refilled.min(u128::from(self.max_tokens)) as u32;
            bucket.last_refill = now;
        }
    }

    /// Time until at least one token will have been refilled
    fn time_until_next_token(&self) -> Duration {
        let bucket = self.lock();
        if bucket.tokens > 0 {
            return Duration::ZERO;
        }

        let since_refill = Instant::now().saturating_duration_since(bucket.last_refill);
        if since_refill >= self.refill_period {
            return Duration::ZERO;
        }

        let per_token = self
            .refill_period
            .as_nanos()
            .div_ceil(u128::from(self.refill_rate));
        let remaining = per_token - since_refill.as_nanos() % per_token;
        Duration::from_nanos(u64::try_from(remaining).unwrap_or(u64::MAX))
    }
}
