use governor::{DefaultKeyedRateLimiter, RateLimiter};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ratelimit::{RateLimitConfig, RateLimitError};

/// Non-blocking per-key limiter for shedding inbound load, e.g. per client
/// address in front of a proxy.
///
/// Every key gets its own token bucket on first use. [`KeyedLimiter::check`]
/// never waits: it takes a token or rejects immediately.
///
/// Keys are evicted by [`KeyedLimiter::sweep`] once their bucket has refilled
/// to the full burst. A bucket that is momentarily full is indistinguishable
/// from an idle one, so a key may be evicted between two bursts and start
/// again from a fresh bucket; a key kept just below full is never evicted.
pub struct KeyedLimiter<K>
where
    K: Hash + Eq + Clone,
{
    limiters: DefaultKeyedRateLimiter<K>,
}

impl<K> Debug for KeyedLimiter<K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLimiter")
            .field("keys", &self.limiters.len())
            .finish()
    }
}

impl<K> KeyedLimiter<K>
where
    K: Hash + Eq + Clone + Display + Send + Sync + 'static,
{
    /// Create a limiter giving every key the same rate
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidQuota`] if `config` cannot form a
    /// token bucket.
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        Ok(Self {
            limiters: RateLimiter::keyed(config.quota()?),
        })
    }

    /// Take a token for `key`, creating its bucket if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Exceeded`] if the bucket of `key` is empty.
    pub fn check(&self, key: &K) -> Result<(), RateLimitError> {
        self.limiters
            .check_key(key)
            .map_err(|_| RateLimitError::Exceeded {
                key: key.to_string(),
            })
    }

    /// Remove every key whose bucket is full again. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.limiters.len();
        self.limiters.retain_recent();
        self.limiters.shrink_to_fit();
        let removed = before.saturating_sub(self.limiters.len());
        if removed > 0 {
            log::debug!("Evicted {removed} idle rate limiters");
        }
        removed
    }

    /// Number of keys with a live bucket
    #[must_use]
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Returns `true` if no key has a live bucket
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Run [`KeyedLimiter::sweep`] every `interval` until `cancel` fires.
    ///
    /// The first sweep happens one `interval` after spawning.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        limiter.sweep();
                    }
                }
            }
        })
    }
}
