use std::fmt;
use url::Url;

/// A type-safe representation of a destination host for rate limiting purposes.
///
/// The key is the lower-cased hostname, followed by `:port` when the URL
/// names a port explicitly, so two services on one machine are limited
/// independently.
///
/// # Examples
///
/// ```
/// use hoopstat_lib::ratelimit::HostKey;
/// use url::Url;
///
/// let url = Url::parse("https://Stats.NBA.com/stats/scoreboardv2").unwrap();
/// assert_eq!(HostKey::from(&url).as_str(), "stats.nba.com");
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(HostKey::from(&url).as_str(), "127.0.0.1:8080");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey(String);

impl HostKey {
    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the key as an owned String
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&Url> for HostKey {
    fn from(url: &Url) -> Self {
        // Normalize to lowercase for consistent lookup
        let host = url.host_str().unwrap_or_default().to_lowercase();
        match url.port() {
            Some(port) => HostKey(format!("{host}:{port}")),
            None => HostKey(host),
        }
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HostKey {
    fn from(host: String) -> Self {
        HostKey(host.to_lowercase())
    }
}

impl From<&str> for HostKey {
    fn from(host: &str) -> Self {
        HostKey(host.to_lowercase())
    }
}
