//! Shared error types for talking to the OneView API.

use serde::Deserialize;
use thiserror::Error;

/// Error envelope the API returns alongside non-2xx statuses.
///
/// The service is not consistent about the field name, so both `detail` and
/// `message` are accepted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Attempt to pull a human-readable reason out of an error response body.
/// Prefers `detail`, falls back to `message`.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    [parsed.detail, parsed.message]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

/// API error type for client-side use
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The response body did not match the expected shape.
    #[error("deserialization error: {0}")]
    Deserialize(String),
    /// The request could not be built (bad header value, unserialisable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Reason reported by the service, when the body carries one.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Http { body, .. } => try_error_detail(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_detail_over_message() {
        let body = r#"{"detail":"Email already registered","message":"conflict"}"#;
        assert_eq!(try_error_detail(body).as_deref(), Some("Email already registered"));
    }

    #[test]
    fn detail_falls_back_to_message_when_detail_blank() {
        let body = r#"{"detail":"  ","message":"code not found"}"#;
        assert_eq!(try_error_detail(body).as_deref(), Some("code not found"));
    }

    #[test]
    fn detail_is_none_for_non_json() {
        assert_eq!(try_error_detail("<html>502</html>"), None);
    }

    #[test]
    fn status_helpers() {
        let err = ApiError::Http { status: 401, body: String::new() };
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
        assert_eq!(ApiError::Network("refused".into()).status(), None);
        assert!(ApiError::Http { status: 409, body: String::new() }.is_conflict());
    }

    #[test]
    fn display() {
        let err = ApiError::Http { status: 404, body: "nope".into() };
        assert_eq!(err.to_string(), "HTTP 404: nope");
    }
}
