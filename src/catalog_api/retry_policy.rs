//! Retry policy for failed catalog calls.
//!
//! Implements exponential backoff with configurable parameters.

use std::time::Duration;

use crate::catalog_api::CatalogError;
use crate::config::ClientSettings;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries before the error is surfaced.
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds (cap for exponential growth).
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(config: &ClientSettings) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
            backoff_multiplier: config.backoff_multiplier,
        }
    }

    /// Backoff for a given retry count.
    ///
    /// Uses exponential backoff: `initial_backoff * multiplier^retry_count`,
    /// capped at `max_backoff_ms`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(i32::MAX as u32) as i32;
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = backoff.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Check if an error should be retried given the current retry count.
    ///
    /// Returns true if:
    /// - The error type is retryable (rate limited or transient)
    /// - The retry count is less than max_retries
    pub fn should_retry(&self, error: &CatalogError, retry_count: u32) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }

    /// Wait before the next attempt: the computed backoff, or the server's
    /// `Retry-After` hint when that is longer.
    pub fn delay_for(&self, error: &CatalogError, retry_count: u32) -> Duration {
        let backoff = self.backoff(retry_count);
        match error {
            CatalogError::RateLimited {
                retry_after: Some(hint),
            } => backoff.max(*hint),
            _ => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_config() {
        let config = ClientSettings {
            max_retries: 5,
            initial_backoff_ms: 250,
            max_backoff_ms: 10_000,
            backoff_multiplier: 3.0,
            ..ClientSettings::default()
        };
        let policy = RetryPolicy::new(&config);

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_backoff_ms, 250);
        assert_eq!(policy.max_backoff_ms, 10_000);
        assert_eq!(policy.backoff_multiplier, 3.0);
    }

    #[test]
    fn test_default() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff_ms, 500);
        assert_eq!(policy.max_backoff_ms, 30_000);
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_capping() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        };

        // 1000 * 2^2 = 4000 (under cap)
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        // 1000 * 2^3 = 8000 -> capped at 5000
        assert_eq!(policy.backoff(3), Duration::from_millis(5000));
        assert_eq!(policy.backoff(30), Duration::from_millis(5000));
    }

    #[test]
    fn test_should_retry_retryable_errors() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(&CatalogError::RateLimited { retry_after: None }, 0));
        assert!(policy.should_retry(&CatalogError::Transient("timeout".to_string()), 2));
    }

    #[test]
    fn test_should_retry_not_found_never_retries() {
        let policy = RetryPolicy::default();
        let not_found = CatalogError::NotFound("album".to_string());

        assert!(!policy.should_retry(&not_found, 0));
        assert!(!policy.should_retry(&not_found, 1));
    }

    #[test]
    fn test_should_retry_max_retries_exceeded() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..Default::default()
        };
        let err = CatalogError::Transient("connection reset".to_string());

        assert!(policy.should_retry(&err, 2));
        assert!(!policy.should_retry(&err, 3));
        assert!(!policy.should_retry(&err, 10));
    }

    #[test]
    fn test_retry_after_hint_used_when_longer() {
        let policy = RetryPolicy::default();
        let hinted = CatalogError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(policy.delay_for(&hinted, 0), Duration::from_secs(7));

        // computed backoff wins when the hint is shorter
        let short_hint = CatalogError::RateLimited {
            retry_after: Some(Duration::from_millis(10)),
        };
        assert_eq!(policy.delay_for(&short_hint, 1), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_initial_backoff() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 0,
            max_backoff_ms: 100,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(5), Duration::ZERO);
    }
}
