use governor::Quota;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::ratelimit::RateLimitError;

/// Default requests per second allowed towards one upstream host
const DEFAULT_RATE: f64 = 3.0;

/// Default number of requests that may be sent back to back
const DEFAULT_BURST: u32 = 5;

/// Finest replenish interval a quota can express
const MIN_INTERVAL: Duration = Duration::from_nanos(1);

/// Token bucket configuration: a steady `rate` in requests per second and a
/// `burst` of requests that may be sent without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens added per second
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Capacity of the bucket
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            burst: default_burst(),
        }
    }
}

/// Default requests per second
const fn default_rate() -> f64 {
    DEFAULT_RATE
}

/// Default burst size
const fn default_burst() -> u32 {
    DEFAULT_BURST
}

impl RateLimitConfig {
    /// Create a config with the given rate and burst
    #[must_use]
    pub const fn new(rate: f64, burst: u32) -> Self {
        Self { rate, burst }
    }

    /// Time it takes to replenish a single token.
    ///
    /// Rates above one token per nanosecond are capped at one nanosecond.
    #[must_use]
    pub fn replenish_interval(&self) -> Option<Duration> {
        if self.rate.is_finite() && self.rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.rate)
                .ok()
                .map(|interval| interval.max(MIN_INTERVAL))
        } else {
            None
        }
    }

    /// Convert into a `governor` quota.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidQuota`] if the rate is not a positive
    /// finite number or the burst is zero.
    pub fn quota(&self) -> Result<Quota, RateLimitError> {
        let invalid = || RateLimitError::InvalidQuota {
            rate: self.rate,
            burst: self.burst,
        };
        let burst = NonZeroU32::new(self.burst).ok_or_else(invalid)?;
        let interval = self.replenish_interval().ok_or_else(invalid)?;
        let quota = Quota::with_period(interval).ok_or_else(invalid)?;
        Ok(quota.allow_burst(burst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate_limit_config() {
        let config = RateLimitConfig::default();
        assert!((config.rate - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.burst, 5);
    }

    #[test]
    fn test_quota() {
        let quota = RateLimitConfig::new(5.0, 5).quota().unwrap();
        assert_eq!(quota.burst_size().get(), 5);
        assert_eq!(quota.replenish_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_very_high_rate_is_capped() {
        let config = RateLimitConfig::new(1e10, 1);
        assert_eq!(config.replenish_interval(), Some(Duration::from_nanos(1)));

        let quota = config.quota().unwrap();
        assert_eq!(quota.replenish_interval(), Duration::from_nanos(1));
    }

    #[test]
    fn test_invalid_quota() {
        assert!(RateLimitConfig::new(0.0, 5).quota().is_err());
        assert!(RateLimitConfig::new(-1.0, 5).quota().is_err());
        assert!(RateLimitConfig::new(f64::NAN, 5).quota().is_err());
        assert!(RateLimitConfig::new(5.0, 0).quota().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RateLimitConfig::new(2.5, 8);

        let toml = toml::to_string(&config).unwrap();
        let deserialized: RateLimitConfig = toml::from_str(&toml).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_defaults_when_missing() {
        let deserialized: RateLimitConfig = toml::from_str("burst = 2").unwrap();
        assert!((deserialized.rate - 3.0).abs() < f64::EPSILON);
        assert_eq!(deserialized.burst, 2);
    }
}
