//! `hoopstat_lib` is the resilient HTTP transport for the NBA stats APIs.
//!
//! Every request passes through a chain of middlewares (retry with backoff,
//! rate limiting, header defaults, logging) before it reaches the wire.
//! "Hello world" example:
//!
//! ```no_run
//! use hoopstat_lib::{QueryParams, Result, stats_client};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = stats_client()?;
//!   let params = QueryParams::new().with("LeagueID", "00").with("Season", "2023-24");
//!   let response = client.get(&CancellationToken::new(), "commonallplayers", &params).await?;
//!   println!("{}", response.text());
//!   Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can assemble the chain yourself and pass
//! it to a [`ClientBuilder`]:
//!
//! ```no_run
//! use hoopstat_lib::{
//!     Chain, ClientBuilder, QueryParams, Result,
//!     middleware::{LogCrateLogger, Logging, PerHostRateLimit, Retry, RetryConfig},
//!     ratelimit::RateLimitConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let chain = Chain::new()
//!       .with(Logging::new(LogCrateLogger::default()))
//!       .with(Retry::new(RetryConfig::default()))
//!       .with(PerHostRateLimit::new(&RateLimitConfig::new(1.0, 1))?);
//!   let client = ClientBuilder::builder()
//!       .base_url("https://stats.nba.com/stats")
//!       .chain(chain)
//!       .build()
//!       .client()?;
//!   let cancel = CancellationToken::new();
//!   let response = client.get(&cancel, "scoreboardv2", &QueryParams::new()).await?;
//!   assert!(response.status.is_success());
//!   Ok(())
//! }
//! ```
#![warn(missing_docs)]

mod chain;
mod client;
mod helpers;
mod roundtrip;
mod types;

pub mod middleware;
pub mod ratelimit;

#[cfg(test)]
mod test_utils;

pub use crate::{
    chain::{Chain, Middleware},
    client::{
        BROWSER_USER_AGENT, Client, ClientBuilder, DEFAULT_REFERER, DEFAULT_TIMEOUT,
        DEFAULT_USER_AGENT, LIVE_BASE_URL, STATS_BASE_URL, default_chain, live_client,
        stats_client,
    },
    roundtrip::{
        BaseTransport, BoxRoundTripper, FnRoundTripper, HttpExecutor, RoundTripper, round_trip_fn,
    },
    types::{ApiError, ApiErrorKind, ErrorKind, QueryParams, RawResponse, Result},
};
