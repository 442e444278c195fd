use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chain::Middleware;
use crate::ratelimit::{HostKey, HostPool, Limiter, RateLimitConfig};
use crate::roundtrip::{BoxRoundTripper, RoundTripper};
use crate::Result;

/// Throttles all requests through one shared token bucket.
#[derive(Debug, Clone)]
pub struct RateLimit {
    limiter: Arc<Limiter>,
}

impl RateLimit {
    /// Limit all requests to `config`
    ///
    /// # Errors
    ///
    /// Returns [`crate::ErrorKind::RateLimit`] if `config` cannot form a
    /// token bucket.
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        Ok(Self {
            limiter: Arc::new(Limiter::new(config)?),
        })
    }
}

impl Middleware for RateLimit {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(GloballyLimited {
            limiter: self.limiter,
            next,
        })
    }
}

#[derive(Debug)]
struct GloballyLimited {
    limiter: Arc<Limiter>,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for GloballyLimited {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        self.limiter.wait(cancel).await?;
        self.next.round_trip(cancel, request).await
    }
}

/// Throttles requests per destination host, each host with its own bucket.
#[derive(Debug, Clone)]
pub struct PerHostRateLimit {
    pool: HostPool,
}

impl PerHostRateLimit {
    /// Limit every host to `config`
    ///
    /// # Errors
    ///
    /// Returns [`crate::ErrorKind::RateLimit`] if `config` cannot form a
    /// token bucket.
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        Ok(Self::from_pool(HostPool::new(config)?))
    }

    /// Use an existing pool, sharing its limiters with other holders
    #[must_use]
    pub const fn from_pool(pool: HostPool) -> Self {
        Self { pool }
    }
}

impl Middleware for PerHostRateLimit {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(HostLimited {
            pool: self.pool,
            next,
        })
    }
}

#[derive(Debug)]
struct HostLimited {
    pool: HostPool,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for HostLimited {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        let host = HostKey::from(request.url());
        self.pool.wait(cancel, &host).await?;
        self.next.round_trip(cancel, request).await
    }
}
