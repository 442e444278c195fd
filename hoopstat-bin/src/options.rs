use std::{collections::BTreeMap, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Error, Result, anyhow};
use clap::{Args, Parser, Subcommand, builder::TypedValueParser};
use http::{
    HeaderMap,
    header::{self, HeaderName, HeaderValue},
};
use hoopstat_lib::{
    BROWSER_USER_AGENT, DEFAULT_TIMEOUT, STATS_BASE_URL, middleware::RetryConfig,
    ratelimit::RateLimitConfig,
};
use serde::Deserialize;

use crate::verbosity::Verbosity;

/// Config file looked up in the working directory when `--config` is not given
pub(crate) const HOOPSTAT_CONFIG_FILE: &str = "hoopstat.toml";

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected to be in format `Header-Name: Header-Value`.
/// The header name and value are trimmed of whitespace.
///
/// If the header contains multiple colons, the part after the first colon is
/// considered the value.
///
/// # Errors
///
/// This fails if the header does not contain a `:` character or if the
/// name or value are not valid in a header.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let parts: Vec<&str> = header.splitn(2, ':').collect();
    match parts.as_slice() {
        [name, value] => {
            let name = name.trim();
            let name = HeaderName::from_str(name)
                .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
            Ok((name, value))
        }
        _ => Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        )),
    }
}

/// Parses a single HTTP header into a tuple of (String, String)
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid =
            |message: String| clap::Error::raw(clap::error::ErrorKind::InvalidValue, message);

        let header_str = value
            .to_str()
            .ok_or_else(|| invalid("Header value contains invalid UTF-8".to_string()))?;
        let (name, value) = parse_single_header(header_str).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid("Header value contains invalid UTF-8".to_string()))?;
        Ok((name.to_string(), value.to_string()))
    }
}

/// Parse a query parameter given as `key=value`
fn parse_param(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!(
            "Query parameter must be of the form key=value, got '{input}'"
        )),
    }
}

/// Extension trait for converting header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs<'a>(
        headers: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs<'a>(
        headers: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value '{value}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// hoopstat fetches data from the NBA stats APIs through a rate-limited,
/// retrying HTTP client.
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct HoopstatOptions {
    /// Configuration file to use
    #[arg(short, long = "config", global = true, value_name = "PATH")]
    pub(crate) config_file: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbose: Verbosity,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Fetch one endpoint and print the response body
    Get(GetArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GetArgs {
    /// Endpoint path below the base URL, e.g. `leaguegamelog`
    pub(crate) endpoint: String,

    /// Query parameter, may be given many times
    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_param,
        action = clap::ArgAction::Append
    )]
    pub(crate) params: Vec<(String, String)>,

    /// Base URL the endpoint is joined onto [default: https://stats.nba.com/stats]
    #[arg(long)]
    pub(crate) base_url: Option<String>,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long = "header",
        action = clap::ArgAction::Append,
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

Specify headers in the format 'Name: Value', e.g. 'Accept: application/json'.
This is the same format that other tools like curl or wget use.
Multiple headers can be specified by using the flag multiple times.
Values given here replace those of the config file."
    )]
    pub(crate) headers: Vec<(String, String)>,

    /// Timeout per request, e.g. `10s` or `500ms` [default: 30s]
    #[arg(long, value_parser = humantime::parse_duration)]
    pub(crate) timeout: Option<Duration>,

    /// Retries after the first attempt [default: 3]
    #[arg(long)]
    pub(crate) max_retries: Option<u32>,

    /// Requests per second towards one host [default: 3]
    #[arg(long)]
    pub(crate) rate: Option<f64>,

    /// Requests that may be sent back to back [default: 5]
    #[arg(long)]
    pub(crate) burst: Option<u32>,

    /// Log method, URL, headers and timing of every attempt
    #[arg(long)]
    pub(crate) verbose_http: bool,

    /// Pretty-print JSON responses
    #[arg(long)]
    pub(crate) pretty: bool,
}

/// Contents of `hoopstat.toml`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Base URL the endpoints are joined onto
    pub(crate) base_url: Option<String>,

    /// Timeout per request
    #[serde(default, with = "humantime_serde")]
    pub(crate) timeout: Option<Duration>,

    /// Headers added to every request
    #[serde(default)]
    pub(crate) headers: BTreeMap<String, String>,

    /// Retry policy
    #[serde(default)]
    pub(crate) retry: RetryConfig,

    /// Per-host rate limit
    #[serde(default)]
    pub(crate) rate_limit: RateLimitConfig,

    /// Log level, e.g. `"info"`; `-v`/`-q` take precedence
    pub(crate) verbose: Option<Verbosity>,
}

/// Everything needed to build a client, after merging file and flags
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) base_url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Duration,
    pub(crate) retry: RetryConfig,
    pub(crate) rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Cannot read configuration file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Load the file given by `--config`, or `hoopstat.toml` if it exists
    pub(crate) fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default = Path::new(HOOPSTAT_CONFIG_FILE);
                if default.is_file() {
                    Self::load_from_file(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Merge the command-line arguments into this configuration.
    ///
    /// Flags win over file values, which win over the built-in defaults.
    pub(crate) fn resolve(self, args: &GetArgs) -> Result<Settings> {
        let base_url = args
            .base_url
            .clone()
            .or(self.base_url)
            .unwrap_or_else(|| STATS_BASE_URL.to_string());

        // Special handling for headers: flags overwrite file values by name
        let mut merged = self.headers;
        merged.extend(args.headers.iter().cloned());
        let mut headers = HeaderMap::from_header_pairs(&merged)?;
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(
                header::USER_AGENT,
                HeaderValue::from_static(BROWSER_USER_AGENT),
            );
        }

        let mut retry = self.retry;
        if let Some(max_retries) = args.max_retries {
            retry.max_retries = max_retries;
        }

        let rate_limit = RateLimitConfig::new(
            args.rate.unwrap_or(self.rate_limit.rate),
            args.burst.unwrap_or(self.rate_limit.burst),
        );

        Ok(Settings {
            base_url,
            headers,
            timeout: args.timeout.or(self.timeout).unwrap_or(DEFAULT_TIMEOUT),
            retry,
            rate_limit,
        })
    }
}
