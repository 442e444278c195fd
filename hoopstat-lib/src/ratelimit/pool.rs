use dashmap::DashMap;
use governor::Quota;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::ratelimit::{HostKey, Limiter, RateLimitConfig, RateLimitError};

/// Manages one blocking [`Limiter`] per destination host.
///
/// # Architecture
///
/// - Each unique host gets its own limiter, so hosts are throttled independently
/// - Limiters are created lazily on first use and live as long as the pool
/// - Creation is double-checked: a shared-lock lookup first, then an
///   entry-locked insert that reuses a limiter created by a concurrent caller
#[derive(Debug, Clone)]
pub struct HostPool {
    /// Map of host to limiter, created on-demand
    hosts: Arc<DashMap<HostKey, Arc<Limiter>>>,

    /// Quota every new limiter starts from
    quota: Quota,
}

impl HostPool {
    /// Create a new `HostPool` giving every host the same rate
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidQuota`] if `config` cannot form a
    /// token bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use hoopstat_lib::ratelimit::{HostPool, RateLimitConfig};
    ///
    /// let pool = HostPool::new(&RateLimitConfig::default()).unwrap();
    /// assert!(pool.is_empty());
    /// ```
    pub fn new(config: &RateLimitConfig) -> std::result::Result<Self, RateLimitError> {
        Ok(Self {
            hosts: Arc::new(DashMap::new()),
            quota: config.quota()?,
        })
    }

    /// Wait for a token of the limiter belonging to `host`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ErrorKind::Cancelled`] if `cancel` fires while waiting.
    pub async fn wait(&self, cancel: &CancellationToken, host: &HostKey) -> Result<()> {
        // The limiter handle is held for the whole wait, so a concurrent
        // removal from the map cannot affect this operation.
        let limiter = self.get_or_create(host);
        limiter.wait(cancel).await
    }

    /// Get an existing limiter or create a new one for the given host
    pub fn get_or_create(&self, host: &HostKey) -> Arc<Limiter> {
        // Check if the limiter already exists
        if let Some(limiter) = self.hosts.get(host) {
            return limiter.clone();
        }

        // Another caller may have inserted one since the lookup above;
        // the entry API checks again under the shard's write lock.
        self.hosts
            .entry(host.clone())
            .or_insert_with(|| {
                log::debug!("Creating rate limiter for host {host}");
                Arc::new(Limiter::from_quota(self.quota))
            })
            .clone()
    }

    /// Number of hosts that currently have a limiter
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns `true` if no host has been seen yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
