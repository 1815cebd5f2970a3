use gdocs_core::error::{codes, rpc};
use serde_json::{Value, json};
use thiserror::Error;

use crate::contract::ValidationErrors;
use crate::normalize::NormalizedError;

/// No valid credential could be established for the current call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthenticationError {
    message: String,
}

impl AuthenticationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything `dispatch` can fail with.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Invalid arguments for tool '{tool}': {errors}")]
    Validation {
        tool: String,
        errors: ValidationErrors,
    },
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Tool(#[from] NormalizedError),
}

impl GatewayError {
    /// Stable string code for the `kind` field.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation { .. } => codes::VALIDATION_FAILED,
            GatewayError::Authentication(_) => codes::AUTHENTICATION_REQUIRED,
            GatewayError::UnknownTool(_) => codes::UNKNOWN_TOOL,
            GatewayError::Tool(err) => err.kind().code(),
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            GatewayError::Tool(err) => err.retryable(),
            _ => false,
        }
    }

    pub fn rpc_code(&self) -> i64 {
        match self {
            GatewayError::Validation { .. } | GatewayError::UnknownTool(_) => rpc::INVALID_PARAMS,
            GatewayError::Authentication(_) => rpc::INVALID_REQUEST,
            GatewayError::Tool(err) => err.kind().rpc_code(),
        }
    }

    /// `data` member of the JSON-RPC error object.
    pub fn rpc_data(&self) -> Value {
        let mut data = json!({
            "kind": self.code(),
            "retryable": self.retryable(),
        });
        if let GatewayError::Validation { errors, .. } = self {
            data["violations"] = json!(errors.violations());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::classify;
    use crate::upstream::UpstreamError;

    #[test]
    fn validation_errors_carry_violations() {
        let err = GatewayError::Validation {
            tool: "create-doc".to_string(),
            errors: ValidationErrors::single("title", "is required"),
        };
        assert_eq!(err.rpc_code(), -32602);
        assert_eq!(
            err.to_string(),
            "Invalid arguments for tool 'create-doc': title: is required"
        );
        assert_eq!(
            err.rpc_data(),
            json!({
                "kind": "validation_failed",
                "retryable": false,
                "violations": [{ "path": "title", "reason": "is required" }]
            })
        );
    }

    #[test]
    fn tool_errors_follow_their_kind() {
        let throttled = GatewayError::from(classify(&UpstreamError::status(429, Value::Null)));
        assert_eq!(throttled.rpc_code(), -32603);
        assert_eq!(
            throttled.rpc_data(),
            json!({ "kind": "rate_limited", "retryable": true })
        );

        let missing = GatewayError::from(classify(&UpstreamError::status(404, Value::Null)));
        assert_eq!(missing.rpc_code(), -32600);
        assert_eq!(missing.code(), "not_found");
    }

    #[test]
    fn auth_and_unknown_tool_codes() {
        let auth = GatewayError::from(AuthenticationError::new("sign in"));
        assert_eq!(auth.rpc_code(), -32600);
        assert_eq!(auth.to_string(), "sign in");
        assert_eq!(auth.code(), "authentication_required");

        let unknown = GatewayError::UnknownTool("delete-doc".to_string());
        assert_eq!(unknown.rpc_code(), -32602);
        assert_eq!(unknown.to_string(), "Unknown tool: delete-doc");
    }
}
