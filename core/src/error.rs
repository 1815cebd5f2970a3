use serde::Serialize;

/// Stable error codes surfaced to tool callers.
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const AUTHENTICATION_REQUIRED: &str = "authentication_required";
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
    pub const AUTH_EXPIRED: &str = "auth_expired";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UPSTREAM_REJECTED: &str = "upstream_rejected";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// JSON-RPC error codes used by the MCP surface.
pub mod rpc {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Classification of a failed upstream operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthExpired,
    PermissionDenied,
    NotFound,
    RateLimited,
    UpstreamUnavailable,
    UpstreamRejected,
    #[serde(rename = "internal_error")]
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::AuthExpired => codes::AUTH_EXPIRED,
            ErrorKind::PermissionDenied => codes::PERMISSION_DENIED,
            ErrorKind::NotFound => codes::NOT_FOUND,
            ErrorKind::RateLimited => codes::RATE_LIMITED,
            ErrorKind::UpstreamUnavailable => codes::UPSTREAM_UNAVAILABLE,
            ErrorKind::UpstreamRejected => codes::UPSTREAM_REJECTED,
            ErrorKind::Internal => codes::INTERNAL_ERROR,
        }
    }

    /// Whether an outer layer may retry after backoff. Nothing in the gateway retries.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::UpstreamUnavailable)
    }

    pub fn rpc_code(self) -> i64 {
        match self {
            ErrorKind::AuthExpired
            | ErrorKind::PermissionDenied
            | ErrorKind::NotFound
            | ErrorKind::UpstreamRejected => rpc::INVALID_REQUEST,
            ErrorKind::RateLimited | ErrorKind::UpstreamUnavailable | ErrorKind::Internal => {
                rpc::INTERNAL_ERROR
            }
        }
    }
}
