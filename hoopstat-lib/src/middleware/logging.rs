use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Request, Response};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chain::Middleware;
use crate::roundtrip::{BoxRoundTripper, RoundTripper};
use crate::Result;

/// Header carrying the correlation ID of [`RequestIdLogging`]
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Sink for the lines written by the logging middlewares.
pub trait Logger: Debug + Send + Sync {
    /// Record one line
    fn log(&self, line: fmt::Arguments<'_>);
}

/// Discards everything. The default for all logging middlewares.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _line: fmt::Arguments<'_>) {}
}

/// Forwards lines to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogCrateLogger {
    level: log::Level,
}

impl LogCrateLogger {
    /// Log at `level`
    #[must_use]
    pub const fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogCrateLogger {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl Logger for LogCrateLogger {
    fn log(&self, line: fmt::Arguments<'_>) {
        log::log!(self.level, "{line}");
    }
}

fn noop() -> Arc<dyn Logger> {
    Arc::new(NoopLogger)
}

/// Logs one line before and one line after every round trip.
#[derive(Debug, Clone)]
pub struct Logging {
    logger: Arc<dyn Logger>,
}

impl Logging {
    /// Log through `logger`
    #[must_use]
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self { logger: noop() }
    }
}

impl Middleware for Logging {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(Logged {
            logger: self.logger,
            next,
        })
    }
}

#[derive(Debug)]
struct Logged {
    logger: Arc<dyn Logger>,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for Logged {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();

        let start = Instant::now();
        self.logger.log(format_args!("Request: {method} {url}"));

        let result = self.next.round_trip(cancel, request).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(response) => self.logger.log(format_args!(
                "Request completed: {method} {url} ({elapsed:?}) - Status: {}",
                response.status().as_u16()
            )),
            Err(e) => self
                .logger
                .log(format_args!("Request failed: {method} {url} ({elapsed:?}) - {e}")),
        }
        result
    }
}

/// Like [`Logging`], but also dumps request and response headers.
#[derive(Debug, Clone)]
pub struct VerboseLogging {
    logger: Arc<dyn Logger>,
}

impl VerboseLogging {
    /// Log through `logger`
    #[must_use]
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

impl Default for VerboseLogging {
    fn default() -> Self {
        Self { logger: noop() }
    }
}

impl Middleware for VerboseLogging {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(VerboseLogged {
            logger: self.logger,
            next,
        })
    }
}

#[derive(Debug)]
struct VerboseLogged {
    logger: Arc<dyn Logger>,
    next: BoxRoundTripper,
}

impl VerboseLogged {
    fn dump_headers(&self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.logger.log(format_args!(
                "  {name}: {}",
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
    }
}

#[async_trait]
impl RoundTripper for VerboseLogged {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        let start = Instant::now();
        self.logger.log(format_args!("=== Request Start ==="));
        self.logger.log(format_args!("Method: {}", request.method()));
        self.logger.log(format_args!("URL: {}", request.url()));
        self.logger.log(format_args!("Headers:"));
        self.dump_headers(request.headers());

        let result = self.next.round_trip(cancel, request).await;

        self.logger
            .log(format_args!("Duration: {:?}", start.elapsed()));
        match &result {
            Ok(response) => {
                self.logger.log(format_args!("Status: {}", response.status()));
                self.logger.log(format_args!("Response Headers:"));
                self.dump_headers(response.headers());
            }
            Err(e) => self.logger.log(format_args!("Error: {e}")),
        }
        self.logger.log(format_args!("=== Request End ==="));
        result
    }
}

/// Tags every request with a correlation ID and prefixes each line with it.
///
/// An `X-Request-ID` already present on the request is reused; otherwise a
/// fresh UUID is set. Placed outside [`crate::middleware::Retry`], every
/// attempt of one logical call carries the same ID.
#[derive(Debug, Clone)]
pub struct RequestIdLogging {
    logger: Arc<dyn Logger>,
}

impl RequestIdLogging {
    /// Log through `logger`
    #[must_use]
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

impl Default for RequestIdLogging {
    fn default() -> Self {
        Self { logger: noop() }
    }
}

impl Middleware for RequestIdLogging {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(RequestIdLogged {
            logger: self.logger,
            next,
        })
    }
}

#[derive(Debug)]
struct RequestIdLogged {
    logger: Arc<dyn Logger>,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for RequestIdLogged {
    async fn round_trip(
        &self,
        cancel: &CancellationToken,
        mut request: Request,
    ) -> Result<Response> {
        let existing = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_owned);
        let request_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                // A hyphenated UUID is always a valid header value
                if let Ok(value) = HeaderValue::from_str(&id) {
                    request.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                id
            }
        };

        let start = Instant::now();
        self.logger.log(format_args!(
            "[{request_id}] Request: {} {}",
            request.method(),
            request.url()
        ));

        let result = self.next.round_trip(cancel, request).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(response) => self.logger.log(format_args!(
                "[{request_id}] Completed ({elapsed:?}): Status {}",
                response.status().as_u16()
            )),
            Err(e) => self
                .logger
                .log(format_args!("[{request_id}] Failed ({elapsed:?}): {e}")),
        }
        result
    }
}
