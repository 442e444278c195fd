//! Ready-made middlewares.
//!
//! Each one wraps the next round-tripper of a [`crate::Chain`]:
//!
//! - [`Retry`]: exponential backoff with jitter for transport failures and
//!   retryable statuses
//! - [`RateLimit`] and [`PerHostRateLimit`]: blocking token buckets, global or
//!   per destination host
//! - [`Headers`] and [`DefaultHeader`]: header injection
//! - [`Logging`], [`VerboseLogging`] and [`RequestIdLogging`]: one line before
//!   and after every round trip

mod headers;
mod logging;
mod ratelimit;
mod retry;

pub use headers::{DefaultHeader, Headers};
pub use logging::{
    LogCrateLogger, Logger, Logging, NoopLogger, REQUEST_ID_HEADER, RequestIdLogging,
    VerboseLogging,
};
pub use ratelimit::{PerHostRateLimit, RateLimit};
pub use retry::{Retry, RetryConfig};
