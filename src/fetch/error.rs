//! Error type for exhausted fetch attempts.

/// Error describing why a fetch gave up.
///
/// A 404 response is not an error - it surfaces as
/// [`FetchOutcome::Absent`](super::FetchOutcome::Absent) without touching this
/// type. `FetchError` only appears once the retry schedule is exhausted (or
/// for failures retries cannot help with).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Server responded with a non-success, non-404 status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The request did not complete within its timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL that was requested.
        url: String,
    },

    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("network error for {url}: {source}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Response body could not be decoded as the expected format.
    #[error("malformed response body from {url}: {reason}")]
    MalformedBody {
        /// The URL that was requested.
        url: String,
        /// Short description of the decode failure.
        reason: String,
    },

    /// The shared concurrency semaphore was closed.
    #[error("fetch concurrency semaphore closed unexpectedly")]
    Concurrency,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a `MalformedBody` error.
    #[must_use]
    pub fn malformed_body(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBody {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_contains_code_and_url() {
        let err = FetchError::http_status("https://example.com/x", 503);
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("https://example.com/x"));
    }

    #[test]
    fn test_timeout_display() {
        let err = FetchError::timeout("https://example.com/slow");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_malformed_body_display() {
        let err = FetchError::malformed_body("https://example.com/j", "not json");
        assert!(err.to_string().contains("not json"));
    }
}
