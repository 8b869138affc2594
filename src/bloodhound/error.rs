//! Error classification for BloodHound API calls

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Coarse class of an API failure. Drives the retry policy and how tool
/// results are reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// 401/403, or a credential that cannot be used for signing
    AuthFailure,
    /// 404
    NotFound,
    /// 429 or 5xx
    Transient,
    /// Connection refused, DNS failure or timeout
    Unreachable,
    /// 400 and any other 4xx the server rejects outright
    BadRequest,
    /// Response exceeded the configured size limit
    ResultTooLarge,
    /// Response body was not the JSON we expected
    Decode,
}

impl ApiErrorKind {
    /// Whether another attempt may succeed without changing the request.
    pub fn is_retryable(self) -> bool {
        matches!(self, ApiErrorKind::Transient | ApiErrorKind::Unreachable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::AuthFailure => "auth_failure",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Transient => "transient",
            ApiErrorKind::Unreachable => "unreachable",
            ApiErrorKind::BadRequest => "bad_request",
            ApiErrorKind::ResultTooLarge => "result_too_large",
            ApiErrorKind::Decode => "decode",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from the BloodHound API.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    /// Server-requested delay from a `Retry-After` header
    pub retry_after: Option<Duration>,
    /// The request ran past its own deadline
    pub timed_out: bool,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after: None,
            timed_out: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = error_detail(body);
        let (kind, message) = match status {
            401 => (
                ApiErrorKind::AuthFailure,
                "authentication failed, check the BloodHound API token".to_string(),
            ),
            403 => (
                ApiErrorKind::AuthFailure,
                "permission denied for this API token".to_string(),
            ),
            404 => (
                ApiErrorKind::NotFound,
                detail.unwrap_or_else(|| "resource not found".to_string()),
            ),
            429 => (
                ApiErrorKind::Transient,
                "rate limit exceeded".to_string(),
            ),
            s if s >= 500 => (
                ApiErrorKind::Transient,
                format!(
                    "BloodHound server error: {}",
                    detail.unwrap_or_else(|| format!("HTTP {s}"))
                ),
            ),
            s => (
                ApiErrorKind::BadRequest,
                detail.unwrap_or_else(|| format!("request rejected with HTTP {s}")),
            ),
        };

        Self {
            kind,
            message,
            status: Some(status),
            retry_after: None,
            timed_out: false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::decode(err.to_string())
        } else if err.is_timeout() {
            ApiError {
                timed_out: true,
                ..ApiError::new(ApiErrorKind::Unreachable, format!("request timed out: {err}"))
            }
        } else {
            ApiError::new(
                ApiErrorKind::Unreachable,
                format!("failed to reach BloodHound: {err}"),
            )
        }
    }
}

/// Pull a human-readable message out of a BloodHound error envelope.
///
/// CE answers with `{"errors":[{"context":..,"message":..}]}`; some proxies
/// and older builds use a flat `{"error": ".."}`.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(message) = value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ApiError::from_status(401, "").kind, ApiErrorKind::AuthFailure);
        assert_eq!(ApiError::from_status(403, "").kind, ApiErrorKind::AuthFailure);
        assert_eq!(ApiError::from_status(404, "").kind, ApiErrorKind::NotFound);
        assert_eq!(ApiError::from_status(429, "").kind, ApiErrorKind::Transient);
        assert_eq!(ApiError::from_status(502, "").kind, ApiErrorKind::Transient);
        assert_eq!(ApiError::from_status(400, "").kind, ApiErrorKind::BadRequest);
        assert_eq!(ApiError::from_status(422, "").kind, ApiErrorKind::BadRequest);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiErrorKind::Transient.is_retryable());
        assert!(ApiErrorKind::Unreachable.is_retryable());
        assert!(!ApiErrorKind::AuthFailure.is_retryable());
        assert!(!ApiErrorKind::NotFound.is_retryable());
        assert!(!ApiErrorKind::BadRequest.is_retryable());
    }

    #[test]
    fn test_detail_from_errors_envelope() {
        let body = r#"{"http_status":400,"errors":[{"context":"cypher","message":"unexpected token"}]}"#;
        let err = ApiError::from_status(400, body);
        assert_eq!(err.message, "unexpected token");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_detail_from_flat_error() {
        let err = ApiError::from_status(500, r#"{"error":"database unavailable"}"#);
        assert_eq!(err.message, "BloodHound server error: database unavailable");
    }

    #[test]
    fn test_non_json_body() {
        let err = ApiError::from_status(503, "<html>bad gateway</html>");
        assert_eq!(err.message, "BloodHound server error: HTTP 503");
    }
}
