use async_trait::async_trait;
use http::StatusCode;
use rand::Rng;
use reqwest::{Request, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::chain::Middleware;
use crate::roundtrip::{BoxRoundTripper, RoundTripper};
use crate::{ErrorKind, Result};

/// Fraction of the computed backoff used as jitter in either direction
const JITTER: f64 = 0.1;

/// Retry policy for one logical call.
///
/// `max_backoff` is expected to be at least `initial_backoff` and the
/// multiplier to be greater than one; neither is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Upper bound for any delay, jitter included
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Response statuses that trigger another attempt
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            retryable_status_codes: [429, 500, 502, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// Whether a response with `status` should be retried
    #[must_use]
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    /// Delay before retry number `attempt` (starting at 1).
    ///
    /// `initial_backoff * multiplier^(attempt - 1)`, moved by up to 10% in
    /// either direction at random, then clamped to `[0, max_backoff]`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(-1.0..=1.0);
        self.jittered_backoff(attempt, factor)
    }

    /// Backoff with a fixed jitter `factor` in `[-1, 1]`
    fn jittered_backoff(&self, attempt: u32, factor: f64) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay = (base + base * JITTER * factor).max(0.0);
        Duration::try_from_secs_f64(delay)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Retries transport failures and retryable statuses with exponential backoff.
///
/// After the budget is spent, the last outcome is returned untouched: an
/// error stays an error and a retryable status comes back as a response.
/// Cancellation is never retried, neither when the inner round-tripper
/// reports it nor while sleeping between attempts.
///
/// Requests with a streaming body cannot be replayed and are sent once.
#[derive(Debug, Clone, Default)]
pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    /// Retry with the given policy
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Middleware for Retry {
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper {
        Box::new(Retrying {
            config: self.config,
            next,
        })
    }
}

#[derive(Debug)]
struct Retrying {
    config: RetryConfig,
    next: BoxRoundTripper,
}

#[async_trait]
impl RoundTripper for Retrying {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        let mut request = request;
        let mut attempt = 0;
        loop {
            let replay = if attempt < self.config.max_retries {
                request.try_clone()
            } else {
                None
            };
            let url = request.url().clone();
            let outcome = self.next.round_trip(cancel, request).await;

            let Some(replay) = replay else {
                return outcome;
            };

            match outcome {
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    log::warn!("Attempt {} for {url} failed: {e}", attempt + 1);
                }
                Ok(response) if self.config.is_retryable(response.status()) => {
                    log::warn!(
                        "Attempt {} for {url} returned {}",
                        attempt + 1,
                        response.status()
                    );
                    // Release the connection before the next attempt
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
                        _ = response.bytes() => {}
                    }
                }
                Ok(response) => return Ok(response),
            }

            attempt += 1;
            let delay = self.config.backoff(attempt);
            log::debug!(
                "Retrying {url} in {delay:?} (retry {attempt}/{})",
                self.config.max_retries
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            request = replay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::roundtrip::BaseTransport;
    use crate::test_utils::{ScriptedTripper, Step, get_request};
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..RetryConfig::default()
        }
    }

    fn retrying(config: RetryConfig, terminal: &ScriptedTripper) -> BoxRoundTripper {
        Chain::new()
            .with(Retry::new(config))
            .wrap(Box::new(terminal.clone()))
    }

    #[test]
    fn test_default_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(30));
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            config.retryable_status_codes.into_iter().collect::<Vec<_>>(),
            vec![429, 500, 502, 503, 504]
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    #[tokio::test]
    async fn test_permanent_failure_is_tried_n_plus_one_times(#[case] max_retries: u32) {
        let terminal = ScriptedTripper::always(Step::NetworkError);
        let tripper = retrying(fast_config(max_retries), &terminal);

        let result = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await;

        assert!(matches!(result, Err(ErrorKind::NetworkRequest(_))));
        assert_eq!(terminal.calls(), max_retries as usize + 1);
    }

    #[tokio::test]
    async fn test_recovers_after_retryable_statuses() {
        let terminal = ScriptedTripper::new(vec![
            Step::Status(StatusCode::SERVICE_UNAVAILABLE),
            Step::Status(StatusCode::SERVICE_UNAVAILABLE),
            Step::Status(StatusCode::OK),
        ]);
        let tripper = retrying(fast_config(3), &terminal);

        let response = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(terminal.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_status_returns_response() {
        let terminal = ScriptedTripper::always(Step::Status(StatusCode::TOO_MANY_REQUESTS));
        let tripper = retrying(fast_config(2), &terminal);

        let response = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(terminal.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_returns_immediately() {
        let terminal = ScriptedTripper::always(Step::Status(StatusCode::NOT_FOUND));
        let tripper = retrying(fast_config(3), &terminal);

        let response = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(terminal.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_budget_means_no_sleep() {
        let terminal = ScriptedTripper::always(Step::NetworkError);
        let config = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        let tripper = retrying(config, &terminal);

        let start = Instant::now();
        let result = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await;

        assert!(result.is_err());
        assert_eq!(terminal.calls(), 1);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let terminal = ScriptedTripper::always(Step::Status(StatusCode::BAD_GATEWAY));
        let config = RetryConfig {
            initial_backoff: Duration::from_secs(10),
            ..RetryConfig::default()
        };
        let tripper = retrying(config, &terminal);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = tripper
            .round_trip(&cancel, get_request("https://example.com/"))
            .await;

        assert!(matches!(result, Err(ErrorKind::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(terminal.calls(), 1);
    }

    /// Serves one 503 whose body never finishes arriving
    async fn stalled_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 1024];
            let _ = socket.read(&mut buffer).await;
            let head = b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 1000\r\n\r\n";
            socket.write_all(head).await.unwrap();
            socket.write_all(b"abc").await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        });
        format!("http://{address}/")
    }

    #[tokio::test]
    async fn test_cancel_while_draining_retryable_body() {
        let url = stalled_body_server().await;
        let executor = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap();
        let tripper = Chain::new()
            .with(Retry::new(RetryConfig::default()))
            .wrap(Box::new(BaseTransport::new(Arc::new(executor))));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = tripper.round_trip(&cancel, get_request(&url)).await;

        assert!(matches!(result, Err(ErrorKind::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[rstest]
    #[case(1, 1.0)]
    #[case(2, 2.0)]
    #[case(3, 4.0)]
    #[case(4, 8.0)]
    fn test_backoff_stays_within_jitter(#[case] attempt: u32, #[case] expected_secs: f64) {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let secs = config.backoff(attempt).as_secs_f64();
            assert!(secs >= expected_secs * 0.9 - 1e-9, "{secs} too small");
            assert!(secs <= expected_secs * 1.1 + 1e-9, "{secs} too large");
        }
    }

    #[test]
    fn test_backoff_is_clamped() {
        let config = RetryConfig::default();
        for attempt in [6, 10, 64, u32::MAX] {
            assert!(config.backoff(attempt) <= config.max_backoff);
        }
        assert_eq!(config.jittered_backoff(10, 1.0), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_bounds() {
        let config = RetryConfig::default();
        let close = |actual: Duration, expected_ms: u64| {
            actual.abs_diff(Duration::from_millis(expected_ms)) < Duration::from_micros(1)
        };
        assert!(close(config.jittered_backoff(1, -1.0), 900));
        assert!(close(config.jittered_backoff(1, 0.0), 1000));
        assert!(close(config.jittered_backoff(2, 1.0), 2200));
    }

    #[test]
    fn test_config_from_toml() {
        let config: RetryConfig = toml::from_str(
            r#"
            max_retries = 5
            initial_backoff = "250ms"
            retryable_status_codes = [503]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.max_backoff, Duration::from_secs(30));
        assert!(config.is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!config.is_retryable(StatusCode::TOO_MANY_REQUESTS));
    }
}
