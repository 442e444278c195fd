use serde::{Serialize, Serializer};
use std::hash::Hash;
use thiserror::Error;
use url::Url;

use crate::ratelimit::RateLimitError;
use crate::types::{ApiError, ApiErrorKind};

/// Possible errors when talking to the stats service through `hoopstat_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while sending the request: DNS, connect, TLS or a
    /// read error before any response arrived
    #[error("Network error while sending request: {0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// The response started arriving but its body could not be read
    #[error("Failed to read response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The underlying `reqwest` client could not be built
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// The operation was cancelled through its cancellation token
    #[error("Operation was cancelled")]
    Cancelled,

    /// The configured base URL cannot be parsed or cannot carry a path
    #[error("Invalid base URL `{0}`: {1}")]
    InvalidBase(String, String),

    /// A header name or value could not be parsed
    #[error("Header could not be parsed: {0}")]
    InvalidHeader(String),

    /// The server answered with a failure status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server answered successfully but the body is not what the caller
    /// asked to decode
    #[error("invalid response format from {url}: {source}")]
    InvalidResponseFormat {
        /// The request URL
        url: Url,
        /// The decoding error
        #[source]
        source: serde_json::Error,
    },

    /// A rate limiter rejected the operation or was misconfigured
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

impl ErrorKind {
    /// The classified API error kind, if this error stems from a failure status.
    ///
    /// This is the programmatic way to match on e.g. "not found" without
    /// inspecting messages.
    #[must_use]
    pub const fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Returns `true` if the error was caused by a cancelled operation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if no usable response was ever received.
    ///
    /// This separates "we reached the server but got a failure status or an
    /// unparsable body" from "we never got an answer".
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkRequest(_) | Self::ReadResponseBody(_))
    }

    /// The HTTP status code attached to this error, if any
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::Api(e) => Some(e.status()),
            Self::NetworkRequest(e) | Self::ReadResponseBody(e) => e.status(),
            _ => None,
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NetworkRequest(e1), Self::NetworkRequest(e2))
            | (Self::ReadResponseBody(e1), Self::ReadResponseBody(e2))
            | (Self::BuildRequestClient(e1), Self::BuildRequestClient(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (Self::InvalidBase(b1, e1), Self::InvalidBase(b2, e2)) => b1 == b2 && e1 == e2,
            (Self::InvalidHeader(h1), Self::InvalidHeader(h2)) => h1 == h2,
            (Self::Api(e1), Self::Api(e2)) => e1 == e2,
            (
                Self::InvalidResponseFormat { url: u1, source: e1 },
                Self::InvalidResponseFormat { url: u2, source: e2 },
            ) => u1 == u2 && e1.to_string() == e2.to_string(),
            (Self::RateLimit(e1), Self::RateLimit(e2)) => e1.to_string() == e2.to_string(),
            (Self::Cancelled, Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        match self {
            Self::NetworkRequest(e) | Self::ReadResponseBody(e) | Self::BuildRequestClient(e) => {
                e.to_string().hash(state);
            }
            Self::InvalidBase(base, e) => (base, e).hash(state),
            Self::InvalidHeader(e) => e.hash(state),
            Self::Api(e) => e.hash(state),
            Self::InvalidResponseFormat { url, source } => (url, source.to_string()).hash(state),
            Self::RateLimit(e) => e.to_string().hash(state),
            Self::Cancelled => std::mem::discriminant(self).hash(state),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<http::header::InvalidHeaderValue> for ErrorKind {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ErrorKind {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}
