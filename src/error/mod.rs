use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Classification of a failed completion request.
///
/// Carried by [`TriageError::RequestFailed`] so callers can tell an expired key
/// from a rate limit without string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailureKind {
    /// Connection, DNS or body transfer failure
    Transport,
    /// The API rejected the credential (HTTP 401/403)
    AuthenticationFailed,
    /// The API asked us to slow down (HTTP 429)
    RateLimited { retry_after: Option<Duration> },
    /// Any other non-success status
    ServiceError { status: u16, message: String },
    /// The response had no choices, or the first choice had no text
    EmptyResponse,
    /// The response body was not the expected completion JSON
    MalformedResponse { details: String },
}

impl RequestFailureKind {
    /// Map a non-success HTTP status (and its body) to a failure kind.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => RequestFailureKind::AuthenticationFailed,
            429 => RequestFailureKind::RateLimited { retry_after },
            _ => RequestFailureKind::ServiceError {
                status,
                message: body.trim().to_string(),
            },
        }
    }
}

impl fmt::Display for RequestFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFailureKind::Transport => write!(f, "transport failure"),
            RequestFailureKind::AuthenticationFailed => {
                write!(f, "authentication failed, check OPENAI_API_KEY")
            }
            RequestFailureKind::RateLimited {
                retry_after: Some(wait),
            } => write!(f, "rate limited, retry after {}s", wait.as_secs()),
            RequestFailureKind::RateLimited { retry_after: None } => write!(f, "rate limited"),
            RequestFailureKind::ServiceError { status, message } => {
                write!(f, "service returned HTTP {}: {}", status, message)
            }
            RequestFailureKind::EmptyResponse => write!(f, "no completion text in response"),
            RequestFailureKind::MalformedResponse { details } => {
                write!(f, "malformed completion response: {}", details)
            }
        }
    }
}

/// Error types for damage triage.
///
/// Every error is terminal for the single request or parse that produced it;
/// nothing in this crate retries.
///
/// # Examples
///
/// ```
/// use damage_triage::{parse_report, TriageError};
///
/// let err = parse_report("<report/>").unwrap_err();
/// assert!(matches!(err, TriageError::SchemaViolation(_)));
/// assert_eq!(err.kind_name(), "SchemaViolation");
/// ```
#[derive(Error, Debug)]
pub enum TriageError {
    /// Missing or invalid credential or setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The completion request failed before producing text
    #[error("Request failed: {kind}")]
    RequestFailed {
        kind: RequestFailureKind,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The request did not complete within the configured timeout
    #[error("Timeout error")]
    Timeout,

    /// Returned XML does not match the damage report schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Returned text is not XML-only
    #[error("Unexpected content: {0}")]
    UnexpectedContent(String),

    /// The image reference cannot be sent
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl TriageError {
    /// Build a `RequestFailed` error without an underlying transport error.
    pub fn request_failed(kind: RequestFailureKind) -> Self {
        TriageError::RequestFailed { kind, source: None }
    }

    /// Stable identifier of the error kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TriageError::Configuration(_) => "ConfigurationError",
            TriageError::RequestFailed { .. } => "RequestFailed",
            TriageError::Timeout => "Timeout",
            TriageError::SchemaViolation(_) => "SchemaViolation",
            TriageError::UnexpectedContent(_) => "UnexpectedContent",
            TriageError::InvalidImage(_) => "InvalidImage",
        }
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return TriageError::Timeout;
        }
        let kind = if e.is_decode() {
            RequestFailureKind::MalformedResponse {
                details: e.to_string(),
            }
        } else {
            RequestFailureKind::Transport
        };
        TriageError::RequestFailed {
            kind,
            source: Some(e),
        }
    }
}

// reqwest::Error has no PartialEq, so two RequestFailed errors compare by kind only
impl PartialEq for TriageError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Configuration(a), Self::Configuration(b)) => a == b,
            (Self::RequestFailed { kind: a, .. }, Self::RequestFailed { kind: b, .. }) => a == b,
            (Self::Timeout, Self::Timeout) => true,
            (Self::SchemaViolation(a), Self::SchemaViolation(b)) => a == b,
            (Self::UnexpectedContent(a), Self::UnexpectedContent(b)) => a == b,
            (Self::InvalidImage(a), Self::InvalidImage(b)) => a == b,
            _ => false,
        }
    }
}

/// A specialized Result type for damage triage operations.
pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            RequestFailureKind::from_status(401, "", None),
            RequestFailureKind::AuthenticationFailed
        );
        assert_eq!(
            RequestFailureKind::from_status(403, "forbidden", None),
            RequestFailureKind::AuthenticationFailed
        );
        assert_eq!(
            RequestFailureKind::from_status(429, "", Some(Duration::from_secs(20))),
            RequestFailureKind::RateLimited {
                retry_after: Some(Duration::from_secs(20))
            }
        );
        assert_eq!(
            RequestFailureKind::from_status(500, " boom \n", None),
            RequestFailureKind::ServiceError {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_display_includes_kind() {
        let err = TriageError::request_failed(RequestFailureKind::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        });
        assert_eq!(err.to_string(), "Request failed: rate limited, retry after 3s");
        assert_eq!(err.kind_name(), "RequestFailed");
    }
}
