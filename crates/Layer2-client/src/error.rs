//! Client error types
//!
//! ClientError carries the transport-level detail of a failed API call.
//! It converts into region_foundation::Error at the crate boundary.

use crate::retry::{RetryClassification, RetryableError};
use region_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur while talking to the research API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Connection failed, DNS, reset
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// 404 for the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("Rate limited{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Server error (5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Rejected request (4xx other than 404/429)
    #[error("Invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    /// Body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be built or the request could not be formed
    #[error("Client error: {0}")]
    Config(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for ClientError {
    fn classify(&self) -> RetryClassification {
        match self {
            ClientError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },

            ClientError::Network(_) | ClientError::Timeout(_) | ClientError::Server { .. } => {
                RetryClassification::Retry
            }

            ClientError::NotFound(_)
            | ClientError::InvalidRequest { .. }
            | ClientError::InvalidResponse(_)
            | ClientError::Config(_)
            | ClientError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl ClientError {
    /// Build from HTTP status code and response body.
    ///
    /// The API reports failures as `{"error": "..."}`; that message is
    /// preferred over the raw body.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

        match status {
            404 => ClientError::NotFound(message),
            429 => ClientError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400..=499 => ClientError::InvalidRequest { status, message },
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Unknown(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Map a reqwest failure
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_http_status(status.as_u16(), "")
        } else {
            ClientError::Network(err.to_string())
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Message suitable for an inline error panel
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { message, .. } | ClientError::InvalidRequest { message, .. } => {
                message.clone()
            }
            ClientError::NotFound(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::from_reqwest(err)
    }
}

/// `{"error": "..."}` → message
fn extract_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("error")
        .and_then(|e| e.as_str().map(String::from).or_else(|| {
            e.get("message").and_then(|m| m.as_str()).map(String::from)
        }))
        .or_else(|| json.get("message").and_then(|m| m.as_str()).map(String::from))
}

/// Try to extract a retry-after value from an error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| v.as_f64())
        .map(|secs| (secs * 1000.0) as u64)
}

// ============================================================================
// region_foundation::Error conversion
// ============================================================================

impl From<ClientError> for FoundationError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network(msg) => FoundationError::Http(format!("Network: {}", msg)),
            ClientError::Timeout(msg) => FoundationError::Timeout(msg),
            ClientError::NotFound(msg) => FoundationError::NotFound(msg),
            ClientError::RateLimited { retry_after_ms } => FoundationError::api(
                429,
                retry_after_ms
                    .map(|ms| format!("Retry after {}ms", ms))
                    .unwrap_or_else(|| "Rate limited".to_string()),
            ),
            ClientError::Server { status, message } => FoundationError::api(status, message),
            ClientError::InvalidRequest { status, message } => {
                FoundationError::api(status, message)
            }
            ClientError::InvalidResponse(msg) => {
                FoundationError::Http(format!("Invalid response: {}", msg))
            }
            ClientError::Config(msg) => FoundationError::Config(msg),
            ClientError::Unknown(msg) => FoundationError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_prefers_error_field() {
        let err = ClientError::from_http_status(400, r#"{"error": "Research is not running"}"#);
        assert_eq!(
            err,
            ClientError::InvalidRequest {
                status: 400,
                message: "Research is not running".to_string()
            }
        );
        assert_eq!(err.user_message(), "Research is not running");
    }

    #[test]
    fn test_from_http_status_mapping() {
        assert!(ClientError::from_http_status(404, "").is_not_found());
        assert!(matches!(
            ClientError::from_http_status(502, "Bad Gateway"),
            ClientError::Server { status: 502, .. }
        ));
        assert_eq!(
            ClientError::from_http_status(429, r#"{"retry_after": 1.5}"#),
            ClientError::RateLimited {
                retry_after_ms: Some(1500)
            }
        );
        assert!(matches!(
            ClientError::from_http_status(302, ""),
            ClientError::Unknown(_)
        ));
    }

    #[test]
    fn test_empty_body_message() {
        let err = ClientError::from_http_status(500, "  ");
        assert_eq!(err.user_message(), "HTTP 500");
    }

    #[test]
    fn test_retry_classification() {
        assert_eq!(
            ClientError::Network("reset".into()).classify(),
            RetryClassification::Retry
        );
        assert_eq!(
            ClientError::NotFound("x".into()).classify(),
            RetryClassification::NoRetry
        );
        assert_eq!(
            ClientError::InvalidResponse("x".into()).classify(),
            RetryClassification::NoRetry
        );
    }

    #[test]
    fn test_into_foundation_error() {
        let err: FoundationError = ClientError::NotFound("task".into()).into();
        assert!(matches!(err, FoundationError::NotFound(_)));

        let err: FoundationError = ClientError::Server {
            status: 503,
            message: "down".into(),
        }
        .into();
        assert!(err.is_retryable());
    }
}
