use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use http::StatusCode;
use reqwest::{Method, Request, Response, Url};
use tokio_util::sync::CancellationToken;

use crate::{ErrorKind, Result, RoundTripper};

/// Build a bare `GET` request for `url`
///
/// # Panic
///
/// This panics on an invalid URL, so it should only be used for testing
pub(crate) fn get_request(url: &str) -> Request {
    Request::new(
        Method::GET,
        Url::parse(url).expect("Expected valid test URL"),
    )
}

/// Build a response with the given status and an empty body
pub(crate) fn response_with_status(status: StatusCode) -> Response {
    response_with_body(status, "")
}

/// Build a response with the given status and body
pub(crate) fn response_with_body(status: StatusCode, body: &'static str) -> Response {
    http::Response::builder()
        .status(status)
        .body(body)
        .expect("Expected valid test response")
        .into()
}

/// A genuine transport-level error, produced without touching the network
pub(crate) fn network_error() -> ErrorKind {
    let error = reqwest::Client::new()
        .get("http://")
        .build()
        .expect_err("Expected an unbuildable request");
    ErrorKind::NetworkRequest(error)
}

/// What a [`ScriptedTripper`] does on one call
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Status(StatusCode),
    NetworkError,
}

/// A terminal round-tripper replaying a script of outcomes.
///
/// The last step repeats once the script runs out. Every call is counted and
/// the headers of every received request are recorded.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedTripper {
    steps: Arc<Vec<Step>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<http::HeaderMap>>>,
}

impl ScriptedTripper {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "a script needs at least one step");
        Self {
            steps: Arc::new(steps),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_headers(&self) -> Vec<http::HeaderMap> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoundTripper for ScriptedTripper {
    async fn round_trip(&self, _cancel: &CancellationToken, request: Request) -> Result<Response> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.headers().clone());
        let step = self.steps[call.min(self.steps.len() - 1)];
        match step {
            Step::Status(status) => Ok(response_with_status(status)),
            Step::NetworkError => Err(network_error()),
        }
    }
}
