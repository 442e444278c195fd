//! The client that endpoint wrappers talk to.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` builds URLs, sends requests through its middleware chain and
//! classifies failure statuses. `ClientBuilder` exposes a finer level of
//! granularity for building a `Client`.
//!
//! For convenience, [`stats_client`] and [`live_client`] build clients for
//! the two public NBA data hosts.
#![allow(clippy::module_name_repetitions)]
use std::{sync::Arc, time::Duration};

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    ApiError, BaseTransport, BoxRoundTripper, Chain, ErrorKind, HttpExecutor, QueryParams,
    RawResponse, Result, RoundTripper,
    helpers::url::build_url,
    middleware::{DefaultHeader, PerHostRateLimit, Retry, RetryConfig},
    ratelimit::RateLimitConfig,
};

/// Base URL of the stats API
pub const STATS_BASE_URL: &str = "https://stats.nba.com/stats";
/// Base URL of the live data CDN
pub const LIVE_BASE_URL: &str = "https://cdn.nba.com/static/json/liveData";
/// Default timeout per request, 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default user agent, `hoopstat/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("hoopstat/", env!("CARGO_PKG_VERSION"));
/// User agent sent by the default chain.
///
/// The stats API rejects requests that do not look like they come from a browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Referer sent by the default chain
pub const DEFAULT_REFERER: &str = "https://www.nba.com/";

/// Rate used for the stats API, 3 requests per second with a burst of 5
const STATS_RATE_LIMIT: RateLimitConfig = RateLimitConfig::new(3.0, 5);
/// Rate used for the live CDN, 5 requests per second with a burst of 10
const LIVE_RATE_LIMIT: RateLimitConfig = RateLimitConfig::new(5.0, 10);

/// The middleware chain used when none is configured.
///
/// In order: retry with [`RetryConfig::default`], browser user agent,
/// referer, `Accept: application/json`, and a per-host rate limit of 3
/// requests per second with a burst of 5.
///
/// # Errors
///
/// Never fails with the built-in settings; the `Result` covers the
/// fallible constructors of the individual middlewares.
pub fn default_chain() -> Result<Chain> {
    Ok(Chain::new()
        .with(Retry::new(RetryConfig::default()))
        .with(DefaultHeader::new(
            header::USER_AGENT,
            HeaderValue::from_static(BROWSER_USER_AGENT),
        ))
        .with(DefaultHeader::new(
            header::REFERER,
            HeaderValue::from_static(DEFAULT_REFERER),
        ))
        .with(DefaultHeader::new(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        ))
        .with(PerHostRateLimit::new(&STATS_RATE_LIMIT)?))
}

/// Builder for [`Client`].
///
/// Only `base_url` is required:
///
/// ```
/// use hoopstat_lib::ClientBuilder;
///
/// let client = ClientBuilder::builder()
///     .base_url("https://stats.nba.com/stats")
///     .build()
///     .client()
///     .unwrap();
/// assert_eq!(client.base_url().as_str(), "https://stats.nba.com/stats");
/// ```
#[derive(TypedBuilder, Debug)]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Base URL every endpoint path is joined onto.
    #[builder(setter(into))]
    base_url: String,
    /// Headers added to every request.
    ///
    /// A `User-Agent` of [`DEFAULT_USER_AGENT`] is added unless one is
    /// given here.
    #[builder(default)]
    headers: HeaderMap,
    /// Timeout per request, including reading the body.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    /// Middlewares wrapped around the executor. See [`default_chain`].
    #[builder(default, setter(strip_option))]
    chain: Option<Chain>,
    /// Puts requests on the wire.
    ///
    /// Defaults to a `reqwest` client that does not reuse connections,
    /// which avoids stale keep-alive connections to the stats API.
    #[builder(default, setter(strip_option))]
    executor: Option<Arc<dyn HttpExecutor>>,
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The base URL is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    /// - A middleware of the default chain cannot be created.
    pub fn client(self) -> Result<Client> {
        let Self {
            base_url,
            mut headers,
            timeout,
            chain,
            executor,
        } = self;

        let base_url = Url::parse(&base_url)
            .map_err(|e| ErrorKind::InvalidBase(base_url.clone(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ErrorKind::InvalidBase(
                base_url.to_string(),
                "URL cannot be a base".to_string(),
            ));
        }

        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(
                header::USER_AGENT,
                HeaderValue::from_static(DEFAULT_USER_AGENT),
            );
        }

        let executor = match executor {
            Some(executor) => executor,
            None => Arc::new(
                reqwest::ClientBuilder::new()
                    .gzip(true)
                    .pool_max_idle_per_host(0)
                    .timeout(timeout)
                    .build()
                    .map_err(ErrorKind::BuildRequestClient)?,
            ),
        };

        let chain = match chain {
            Some(chain) => chain,
            None => default_chain()?,
        };
        log::debug!(
            "Creating client for {base_url} with {} middlewares",
            chain.len()
        );
        let transport = chain.wrap(Box::new(BaseTransport::new(executor)));

        Ok(Client {
            base_url,
            headers,
            timeout,
            transport,
        })
    }
}

/// Sends `GET` requests to one base URL through a middleware chain.
///
/// A `Client` is safe to share between tasks. The default headers can only
/// be changed through `&mut self`, i.e. before the client is shared.
///
/// See [`ClientBuilder`] for the available options.
#[derive(Debug)]
pub struct Client {
    /// Base URL every endpoint path is joined onto
    base_url: Url,
    /// Headers added to every request
    headers: HeaderMap,
    /// Timeout per request
    timeout: Duration,
    /// The chain, wrapped around the executor
    transport: BoxRoundTripper,
}

impl Client {
    /// Fetch `endpoint` with the given query parameters and read the whole body.
    ///
    /// # Errors
    ///
    /// This returns an `Err` if
    /// - `cancel` fires before the body has been read.
    /// - No response was received, or its body could not be read.
    /// - The final response has a status of 400 or above
    ///   ([`ErrorKind::Api`]; see [`ErrorKind::api_kind`]).
    /// - A middleware fails, e.g. with an invalid rate limit.
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<RawResponse> {
        let url = build_url(&self.base_url, endpoint, params)?;

        let mut request = Request::new(Method::GET, url.clone());
        *request.timeout_mut() = Some(self.timeout);
        let request_headers = request.headers_mut();
        for (name, value) in &self.headers {
            request_headers.append(name.clone(), value.clone());
        }

        let response = self.transport.round_trip(cancel, request).await?;
        let status = response.status();
        let headers = response.headers().clone();

        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
            body = response.bytes() => body.map_err(ErrorKind::ReadResponseBody)?,
        };

        if let Some(error) = ApiError::from_status(status, &url) {
            log::debug!("{error}");
            return Err(error.into());
        }

        Ok(RawResponse {
            body: body.to_vec(),
            status,
            url,
            headers,
        })
    }

    /// Like [`Client::get`], then decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Everything [`Client::get`] returns, plus
    /// [`ErrorKind::InvalidResponseFormat`] if the body does not decode into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<T> {
        self.get(cancel, endpoint, params).await?.json()
    }

    /// Replace all values of the default header `name`
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Add a value to the default header `name`, keeping existing ones
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Replace all default headers
    pub fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }

    /// The headers added to every request
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The base URL endpoints are joined onto
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// A client for the stats API with the [`default_chain`].
///
/// # Errors
///
/// See [`ClientBuilder::client`].
pub fn stats_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(BROWSER_USER_AGENT),
    );
    ClientBuilder::builder()
        .base_url(STATS_BASE_URL)
        .headers(headers)
        .build()
        .client()
}

/// A client for the live data CDN.
///
/// The CDN needs no referer and tolerates a higher rate than the stats API.
///
/// # Errors
///
/// See [`ClientBuilder::client`].
pub fn live_client() -> Result<Client> {
    let chain = Chain::new()
        .with(DefaultHeader::new(
            header::USER_AGENT,
            HeaderValue::from_static(BROWSER_USER_AGENT),
        ))
        .with(PerHostRateLimit::new(&LIVE_RATE_LIMIT)?);
    ClientBuilder::builder()
        .base_url(LIVE_BASE_URL)
        .chain(chain)
        .build()
        .client()
}
