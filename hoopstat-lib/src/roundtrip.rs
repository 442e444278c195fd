//! The unit of composition: one request in, one response (or error) out.
//!
//! Every middleware wraps a [`RoundTripper`] and is itself a
//! [`RoundTripper`]. The innermost one is [`BaseTransport`], which hands the
//! request to an [`HttpExecutor`] (by default a `reqwest::Client`).

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{ErrorKind, Result};

/// Performs a single request/response exchange.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait RoundTripper: Debug + Send + Sync {
    /// Send `request` and return the response.
    ///
    /// Once `cancel` fires, implementations that suspend must stop waiting and
    /// return [`ErrorKind::Cancelled`].
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response>;
}

/// An owned, type-erased round-tripper.
pub type BoxRoundTripper = Box<dyn RoundTripper>;

#[async_trait]
impl<T: RoundTripper + ?Sized> RoundTripper for Box<T> {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        (**self).round_trip(cancel, request).await
    }
}

#[async_trait]
impl<T: RoundTripper + ?Sized> RoundTripper for Arc<T> {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        (**self).round_trip(cancel, request).await
    }
}

/// The strategy that puts a request on the wire.
///
/// Injectable so that tests can replace the network.
#[async_trait]
pub trait HttpExecutor: Debug + Send + Sync {
    /// Execute `request`.
    async fn execute(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl HttpExecutor for reqwest::Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        reqwest::Client::execute(self, request)
            .await
            .map_err(ErrorKind::NetworkRequest)
    }
}

/// The terminal round-tripper of every chain.
#[derive(Debug, Clone)]
pub struct BaseTransport {
    executor: Arc<dyn HttpExecutor>,
}

impl BaseTransport {
    /// Create a transport executing requests through `executor`
    #[must_use]
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl RoundTripper for BaseTransport {
    async fn round_trip(&self, cancel: &CancellationToken, request: Request) -> Result<Response> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ErrorKind::Cancelled),
            response = self.executor.execute(request) => response,
        }
    }
}

/// A round-tripper backed by an async closure.
///
/// Handy for terminal test doubles and ad-hoc transports.
pub struct FnRoundTripper<F> {
    f: F,
}

impl<F> Debug for FnRoundTripper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRoundTripper").finish_non_exhaustive()
    }
}

/// Wrap an async closure into a [`RoundTripper`]
pub fn round_trip_fn<F, Fut>(f: F) -> FnRoundTripper<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    FnRoundTripper { f }
}

#[async_trait]
impl<F, Fut> RoundTripper for FnRoundTripper<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn round_trip(&self, _cancel: &CancellationToken, request: Request) -> Result<Response> {
        (self.f)(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{get_request, response_with_status};
    use http::StatusCode;
    use std::time::Duration;

    #[derive(Debug)]
    struct StaticExecutor(StatusCode);

    #[async_trait]
    impl HttpExecutor for StaticExecutor {
        async fn execute(&self, _request: Request) -> Result<Response> {
            Ok(response_with_status(self.0))
        }
    }

    #[derive(Debug)]
    struct HangingExecutor;

    #[async_trait]
    impl HttpExecutor for HangingExecutor {
        async fn execute(&self, _request: Request) -> Result<Response> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(response_with_status(StatusCode::OK))
        }
    }

    #[tokio::test]
    async fn test_base_transport_uses_executor() {
        let transport = BaseTransport::new(Arc::new(StaticExecutor(StatusCode::ACCEPTED)));
        let response = transport
            .round_trip(&CancellationToken::new(), get_request("https://example.com/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_base_transport_observes_cancellation() {
        let transport = BaseTransport::new(Arc::new(HangingExecutor));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.round_trip(&cancel, get_request("https://example.com/")),
        )
        .await
        .expect("cancellation should end the exchange early");
        assert!(matches!(result, Err(ErrorKind::Cancelled)));
    }

    #[tokio::test]
    async fn test_round_trip_fn() {
        let tripper = round_trip_fn(|request: Request| async move {
            assert_eq!(request.url().path(), "/ping");
            Ok(response_with_status(StatusCode::NO_CONTENT))
        });
        let response = tripper
            .round_trip(&CancellationToken::new(), get_request("https://example.com/ping"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
