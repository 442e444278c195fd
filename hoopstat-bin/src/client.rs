use anyhow::{Context, Result};
use hoopstat_lib::{
    Chain, Client, ClientBuilder, DEFAULT_REFERER,
    middleware::{
        DefaultHeader, LogCrateLogger, PerHostRateLimit, RequestIdLogging, Retry, VerboseLogging,
    },
};
use http::header::{self, HeaderValue};
use log::Level;

use crate::options::Settings;

/// Creates a client according to the merged configuration.
///
/// The chain mirrors the library default, with a logging layer in front.
/// Being outermost, the request ID stays the same across retries.
pub(crate) fn create(settings: &Settings, verbose_http: bool) -> Result<Client> {
    let mut chain = if verbose_http {
        Chain::new().with(VerboseLogging::new(LogCrateLogger::new(Level::Info)))
    } else {
        Chain::new().with(RequestIdLogging::new(LogCrateLogger::new(Level::Debug)))
    };

    chain = chain
        .with(Retry::new(settings.retry.clone()))
        .with(DefaultHeader::new(
            header::REFERER,
            HeaderValue::from_static(DEFAULT_REFERER),
        ))
        .with(DefaultHeader::new(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        ))
        .with(PerHostRateLimit::new(&settings.rate_limit).context("Invalid rate limit")?);

    ClientBuilder::builder()
        .base_url(settings.base_url.clone())
        .headers(settings.headers.clone())
        .timeout(settings.timeout)
        .chain(chain)
        .build()
        .client()
        .context("Failed to create request client")
}
