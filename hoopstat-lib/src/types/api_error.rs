use http::StatusCode;
use std::fmt;
use thiserror::Error;
use url::Url;

/// The class of a failure status returned by the stats service.
///
/// Every [`ApiError`] exposes its kind as its error `source`, so callers can
/// match on the kind instead of parsing messages.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 404
    #[error("resource not found")]
    NotFound,
    /// 401 or 403
    #[error("unauthorized")]
    Unauthorized,
    /// 429
    #[error("rate limited")]
    RateLimited,
    /// 400
    #[error("invalid request parameters")]
    InvalidRequest,
    /// 408 or 504
    #[error("request timeout")]
    Timeout,
    /// Any other 5xx
    #[error("server error")]
    ServerError,
    /// Any other 4xx
    #[error("client error")]
    ClientError,
}

impl ApiErrorKind {
    /// Classify a status code. Statuses below 400 are not errors.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Option<Self> {
        let kind = match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::BAD_REQUEST => Self::InvalidRequest,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => Self::Timeout,
            s if s.is_server_error() || s.as_u16() >= 600 => Self::ServerError,
            s if s.as_u16() >= 400 => Self::ClientError,
            _ => return None,
        };
        Some(kind)
    }
}

/// A failure status returned by the stats service for a given request
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiError {
    status: StatusCode,
    url: Url,
    message: String,
    #[source]
    kind: ApiErrorKind,
}

impl ApiError {
    /// Build the error for `status` returned by `url`, or `None` for statuses
    /// below 400.
    #[must_use]
    pub fn from_status(status: StatusCode, url: &Url) -> Option<Self> {
        let kind = ApiErrorKind::from_status(status)?;
        let message = match kind {
            ApiErrorKind::NotFound => "resource not found",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::RateLimited => "rate limited",
            ApiErrorKind::InvalidRequest => "invalid request",
            ApiErrorKind::Timeout => "request timeout",
            ApiErrorKind::ServerError => "server error",
            ApiErrorKind::ClientError => "client error",
        };
        Some(Self {
            status,
            url: url.clone(),
            message: message.to_string(),
            kind,
        })
    }

    /// The status code returned by the server
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The URL that was requested
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// A short human-readable description
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The kind, for programmatic matching
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error (status {}, url {}): {}",
            self.status.as_u16(),
            self.url,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::error::Error;

    #[rstest]
    #[case(404, Some(ApiErrorKind::NotFound))]
    #[case(401, Some(ApiErrorKind::Unauthorized))]
    #[case(403, Some(ApiErrorKind::Unauthorized))]
    #[case(429, Some(ApiErrorKind::RateLimited))]
    #[case(400, Some(ApiErrorKind::InvalidRequest))]
    #[case(504, Some(ApiErrorKind::Timeout))]
    #[case(408, Some(ApiErrorKind::Timeout))]
    #[case(500, Some(ApiErrorKind::ServerError))]
    #[case(502, Some(ApiErrorKind::ServerError))]
    #[case(503, Some(ApiErrorKind::ServerError))]
    #[case(418, Some(ApiErrorKind::ClientError))]
    #[case(422, Some(ApiErrorKind::ClientError))]
    #[case(200, None)]
    #[case(204, None)]
    #[case(304, None)]
    fn test_status_classification(#[case] code: u16, #[case] expected: Option<ApiErrorKind>) {
        let status = StatusCode::from_u16(code).unwrap();
        assert_eq!(ApiErrorKind::from_status(status), expected);
        // Pure function: same answer every time
        assert_eq!(ApiErrorKind::from_status(status), expected);
    }

    #[test]
    fn test_api_error_carries_context() {
        let url = Url::parse("https://stats.example.com/stats/playercareerstats").unwrap();
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, &url).unwrap();

        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.url(), &url);
        assert_eq!(err.message(), "rate limited");
        assert_eq!(
            err.to_string(),
            "API error (status 429, url https://stats.example.com/stats/playercareerstats): rate limited"
        );

        let source = err.source().unwrap();
        assert_eq!(
            source.downcast_ref::<ApiErrorKind>(),
            Some(&ApiErrorKind::RateLimited)
        );
    }

    #[test]
    fn test_success_is_not_an_error() {
        let url = Url::parse("https://stats.example.com/").unwrap();
        assert!(ApiError::from_status(StatusCode::OK, &url).is_none());
    }
}
