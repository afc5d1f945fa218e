use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a [`super::CatalogApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The remote quota was exceeded (HTTP 429).
    #[error("rate limited by the catalog")]
    RateLimited { retry_after: Option<Duration> },

    /// Network failure, timeout or 5xx.
    #[error("transient catalog failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded.
    #[error("malformed catalog response: {0}")]
    Malformed(String),

    #[error("catalog authentication failed: {0}")]
    Auth(String),

    /// Any other non-success status.
    #[error("catalog rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl CatalogError {
    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::RateLimited { .. } | CatalogError::Transient(_)
        )
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Malformed(err.to_string())
        } else {
            CatalogError::Transient(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CatalogError::RateLimited { retry_after: None }.is_retryable());
        assert!(CatalogError::Transient("503".to_string()).is_retryable());
        assert!(!CatalogError::NotFound("artist".to_string()).is_retryable());
        assert!(!CatalogError::Malformed("json".to_string()).is_retryable());
        assert!(!CatalogError::Auth("401".to_string()).is_retryable());
        assert!(!CatalogError::Rejected {
            status: 400,
            message: "bad".to_string()
        }
        .is_retryable());
    }
}
