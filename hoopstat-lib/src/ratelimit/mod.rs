//! Token-bucket rate limiting.
//!
//! Two flavours share the same algorithm (`governor`'s GCRA, equivalent to a
//! continuously refilled token bucket):
//!
//! - Blocking, client side: callers wait for a token before a request leaves.
//!   [`Limiter`] is a single rate domain, [`HostPool`] keeps one per
//!   destination host.
//! - Non-blocking, ingress side: [`KeyedLimiter`] rejects immediately when a
//!   key (e.g. a client address) has no token left, and evicts idle keys.
//!
//! # Architecture
//!
//! - [`HostKey`]: Represents a host (and explicit port) for rate limiting
//! - [`RateLimitConfig`]: Rate and burst of a bucket
//! - [`RateLimitError`]: Rejections and invalid configurations

mod config;
mod error;
mod ingress;
mod key;
mod limiter;
mod pool;

pub use config::RateLimitConfig;
pub use error::RateLimitError;
pub use ingress::KeyedLimiter;
pub use key::HostKey;
pub use limiter::Limiter;
pub use pool::HostPool;
