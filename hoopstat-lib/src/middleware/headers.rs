use async_trait::async_trait;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Request, Response};
use tokio_util::sync::CancellationToken;

use crate::chain::Middleware;
use crate::roundtrip::{BoxRoundTripper, RoundTripper};
use crate::{ErrorKind, Result};

/// Appends a fixed set of headers to every request.
///
/// Values are added next to any the request already carries, never replacing them.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HeaderMap,
}

impl Headers {
    /// Inject `headers` into every request
    #[must_use]
    pub const fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

impl Middleware for Headers {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(WithHeaders {
            headers: self.headers,
            next,
        })
    }
}

#[derive(Debug)]
struct WithHeaders {
    headers: HeaderMap,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for WithHeaders {
    async fn round_trip(
        &self,
        cancel: &CancellationToken,
        mut request: Request,
    ) -> Result<Response> {
        let target = request.headers_mut();
        for (name, value) in &self.headers {
            target.append(name.clone(), value.clone());
        }
        self.next.round_trip(cancel, request).await
    }
}

/// Sets one header unless the request already carries it.
///
/// Caller-supplied values always win, which makes this suitable for
/// identity defaults such as `User-Agent`, `Referer` and `Accept`.
#[derive(Debug, Clone)]
pub struct DefaultHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl DefaultHeader {
    /// Default `name` to `value`
    #[must_use]
    pub const fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Default the `User-Agent` header
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidHeader`] if `value` is not a valid header value.
    pub fn user_agent(value: &str) -> Result<Self> {
        Self::parse(header::USER_AGENT, value)
    }

    /// Default the `Referer` header
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidHeader`] if `value` is not a valid header value.
    pub fn referer(value: &str) -> Result<Self> {
        Self::parse(header::REFERER, value)
    }

    /// Default the `Accept` header
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidHeader`] if `value` is not a valid header value.
    pub fn accept(value: &str) -> Result<Self> {
        Self::parse(header::ACCEPT, value)
    }

    fn parse(name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(ErrorKind::from)?;
        Ok(Self::new(name, value))
    }
}

impl Middleware for DefaultHeader {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(WithDefaultHeader {
            name: self.name,
            value: self.value,
            next,
        })
    }
}

#[derive(Debug)]
struct WithDefaultHeader {
    name: HeaderName,
    value: HeaderValue,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for WithDefaultHeader {
    async fn round_trip(
        &self,
        cancel: &CancellationToken,
        mut request: Request,
    ) -> Result<Response> {
        let missing = request
            .headers()
            .get(&self.name)
            .is_none_or(|value| value.is_empty());
        if missing {
            request
                .headers_mut()
                .insert(self.name.clone(), self.value.clone());
        }
        self.next.round_trip(cancel, request).await
    }
}
