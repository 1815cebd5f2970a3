//! Classification of upstream failures into the stable error taxonomy.

use std::fmt;

use gdocs_core::ErrorKind;
use serde_json::Value;

use crate::upstream::UpstreamError;

const AUTH_EXPIRED_MESSAGE: &str = "Authentication token is invalid or expired. Please re-run the authentication flow (`gdocs auth login`).";
const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";
const UNKNOWN_MESSAGE: &str = "An unknown error occurred";

/// A classified failure. Only [`classify`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    kind: ErrorKind,
    message: String,
}

impl NormalizedError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NormalizedError {}

/// Total and deterministic: every failure maps to exactly one kind.
///
/// Grant expiry is checked before any status rule since an expired grant
/// arrives with a 400 or 401 status.
pub fn classify(error: &UpstreamError) -> NormalizedError {
    match error {
        UpstreamError::Status { status, body } => classify_status(*status, body),
        UpstreamError::Timeout(_) => internal(error.to_string()),
        UpstreamError::Transport(message) | UpstreamError::Decode(message) => {
            internal(message.clone())
        }
        UpstreamError::Opaque => unknown(),
    }
}

fn classify_status(status: u16, body: &Value) -> NormalizedError {
    if is_grant_expired(status, body) {
        return NormalizedError {
            kind: ErrorKind::AuthExpired,
            message: AUTH_EXPIRED_MESSAGE.to_string(),
        };
    }

    let detail = upstream_message(body);
    let fallback = || format!("request failed with status {status}");
    let (kind, message) = match status {
        403 => (
            ErrorKind::PermissionDenied,
            format!(
                "Access denied: {}",
                detail.unwrap_or("Insufficient permissions")
            ),
        ),
        404 => (
            ErrorKind::NotFound,
            format!(
                "Resource not found: {}",
                detail.unwrap_or("The requested document or file does not exist")
            ),
        ),
        429 => (ErrorKind::RateLimited, RATE_LIMITED_MESSAGE.to_string()),
        500.. => (
            ErrorKind::UpstreamUnavailable,
            format!(
                "Google API server error: {}",
                detail.map(str::to_string).unwrap_or_else(fallback)
            ),
        ),
        _ => (
            ErrorKind::UpstreamRejected,
            format!(
                "Google API error: {}",
                detail.map(str::to_string).unwrap_or_else(fallback)
            ),
        ),
    };
    NormalizedError { kind, message }
}

fn is_grant_expired(status: u16, body: &Value) -> bool {
    if body.get("error").and_then(Value::as_str) == Some("invalid_grant") {
        return true;
    }
    status == 401
        && body
            .pointer("/error/status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "UNAUTHENTICATED")
}

fn upstream_message(body: &Value) -> Option<&str> {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
}

fn internal(message: String) -> NormalizedError {
    let message = message.trim();
    if message.is_empty() {
        return unknown();
    }
    NormalizedError {
        kind: ErrorKind::Internal,
        message: format!("Internal error: {message}"),
    }
}

fn unknown() -> NormalizedError {
    NormalizedError {
        kind: ErrorKind::Internal,
        message: UNKNOWN_MESSAGE.to_string(),
    }
}
