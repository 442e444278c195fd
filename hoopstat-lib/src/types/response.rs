use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{ErrorKind, Result};

/// A fully read response from the stats service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// The complete response body
    pub body: Vec<u8>,
    /// The status code of the final attempt
    pub status: StatusCode,
    /// The request URL
    pub url: Url,
    /// The response headers
    pub headers: HeaderMap,
}

impl RawResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidResponseFormat`] if the body does not
    /// decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| ErrorKind::InvalidResponseFormat {
            url: self.url.clone(),
            source,
        })
    }

    /// The body as UTF-8 text, replacing invalid sequences
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn response(body: &str) -> RawResponse {
        RawResponse {
            body: body.as_bytes().to_vec(),
            status: StatusCode::OK,
            url: Url::parse("https://stats.example.com/stats/scoreboardv2").unwrap(),
            headers: HeaderMap::new(),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Resource {
        resource: String,
    }

    #[test]
    fn test_json_decodes() {
        let decoded: Resource = response(r#"{"resource": "scoreboard"}"#).json().unwrap();
        assert_eq!(decoded.resource, "scoreboard");
    }

    #[test]
    fn test_json_failure_is_invalid_format() {
        let err = response("<html>").json::<Resource>().unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidResponseFormat { .. }));
    }
}
