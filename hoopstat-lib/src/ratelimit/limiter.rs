use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use tokio_util::sync::CancellationToken;

use crate::ratelimit::{RateLimitConfig, RateLimitError};
use crate::{ErrorKind, Result};

/// A single token bucket whose callers wait for a token.
#[derive(Debug)]
pub struct Limiter {
    /// Rate limiter using token bucket algorithm
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl Limiter {
    /// Create a limiter from a rate configuration
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidQuota`] for a non-positive rate or a
    /// zero burst.
    pub fn new(config: &RateLimitConfig) -> std::result::Result<Self, RateLimitError> {
        Ok(Self::from_quota(config.quota()?))
    }

    /// Create a limiter from an already validated quota
    #[must_use]
    pub fn from_quota(quota: Quota) -> Self {
        Self {
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    /// Take one token without waiting. Returns `false` if none is available.
    pub fn try_acquire(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    /// Wait until one token is available and take it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`] if `cancel` fires first, in which case
    /// no token is consumed.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ErrorKind::Cancelled);
        }
        if self.try_acquire() {
            return Ok(());
        }

        log::debug!("Rate limit reached, waiting for a token");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ErrorKind::Cancelled),
            () = self.rate_limiter.until_ready() => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_burst_then_wait() {
        let limiter = Limiter::new(&RateLimitConfig::new(5.0, 5)).unwrap();
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait(&cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(100));

        let before_sixth = Instant::now();
        limiter.wait(&cancel).await.unwrap();
        // One token per 200ms; allow some slack for timer granularity
        assert!(before_sixth.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_try_acquire_does_not_wait() {
        let limiter = Limiter::new(&RateLimitConfig::new(1.0, 2)).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let limiter = Limiter::new(&RateLimitConfig::new(0.1, 1)).unwrap();
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = limiter.wait(&cancel).await;
        assert!(matches!(result, Err(ErrorKind::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled_fails_fast() {
        let limiter = Limiter::new(&RateLimitConfig::new(1.0, 1)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(limiter.wait(&cancel).await, Err(ErrorKind::Cancelled)));
        // The token was not consumed
        assert!(limiter.try_acquire());
    }
}
