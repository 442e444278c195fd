use thiserror::Error;

/// Errors that can occur during rate limiting operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateLimitError {
    /// A key exceeded its rate limit and the operation was rejected
    #[error("Rate limit exceeded for {key}")]
    Exceeded {
        /// The key (e.g. client address) that exceeded the limit
        key: String,
    },

    /// The configured rate or burst cannot form a token bucket
    #[error("Invalid rate limit: {rate} requests/s with burst {burst}")]
    InvalidQuota {
        /// Configured requests per second
        rate: f64,
        /// Configured burst size
        burst: u32,
    },
}
