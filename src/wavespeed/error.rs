//! Error types for the WaveSpeed prediction API client.
//!
//! [`WavespeedError`] separates the failure modes the retry layer cares
//! about: rate limiting is retryable, other API errors are terminal for
//! the item, and network errors are transient.

use thiserror::Error;

/// Errors returned while talking to the WaveSpeed API.
#[derive(Debug, Error)]
pub enum WavespeedError {
    /// The server returned HTTP 429. `retry_after_ms` carries the
    /// `retry-after` header when present, defaulting to 1000ms.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Any other non-2xx response. Contains the HTTP status code and the
    /// response body text.
    #[error("HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    /// A 2xx submit response that did not contain a prediction id.
    #[error("No request ID in response")]
    MissingRequestId,

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl WavespeedError {
    /// Whether a submit attempt that produced this error may be retried.
    /// Only rate limiting and transport failures qualify; every other
    /// response is acted on exactly once.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WavespeedError::RateLimited { .. } | WavespeedError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let err = WavespeedError::RateLimited {
            retry_after_ms: 4000,
        };
        assert_eq!(err.to_string(), "rate limited, retry after 4000ms");
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = WavespeedError::ApiError {
            status: 500,
            message: "internal error".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: internal error");
    }

    #[test]
    fn missing_request_id_display() {
        assert_eq!(
            WavespeedError::MissingRequestId.to_string(),
            "No request ID in response"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(
            WavespeedError::RateLimited {
                retry_after_ms: 1000
            }
            .is_transient()
        );
        assert!(
            !WavespeedError::ApiError {
                status: 500,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!WavespeedError::MissingRequestId.is_transient());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WavespeedError>();
    }
}
