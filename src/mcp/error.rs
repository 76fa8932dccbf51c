//! Canonical error shape returned across the dispatch boundary.
//!
//! Every failure on the way through `tools/call` ends up as one [`McpError`]
//! carrying a JSON-RPC error code. [`normalize`] is the single place that
//! decides which code a failure gets.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::contract::ValidationErrors;

/// Message used when a failure carries nothing we can show the caller.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// JSON-RPC error codes a dispatch can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ErrorCode {
    /// No enabled tool with the requested name.
    InvalidRequest,
    /// Arguments failed validation against the tool contract.
    InvalidParams,
    /// Anything else.
    InternalError,
}

impl ErrorCode {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::InvalidRequest => -32600,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        code.as_i64()
    }
}

impl TryFrom<i64> for ErrorCode {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -32600 => Ok(Self::InvalidRequest),
            -32602 => Ok(Self::InvalidParams),
            -32603 => Ok(Self::InternalError),
            other => Err(format!("unsupported error code {other}")),
        }
    }
}

/// The normalized error. Constructed fresh for every failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("MCP error {}: {message}", .code.as_i64())]
pub struct McpError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attach a diagnostic payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::invalid_request(format!("Unknown tool: {}", name))
    }
}

impl From<ValidationErrors> for McpError {
    fn from(errors: ValidationErrors) -> Self {
        Self::invalid_params(errors.summary())
    }
}

/// A raw value raised by a handler that is not an error type of its own.
///
/// Handlers that relay an arbitrary payload from a collaborator wrap it in
/// this so the normalizer can look inside it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("thrown value: {0}")]
pub struct ThrownValue(pub Value);

/// Collapse any handler failure into an [`McpError`].
///
/// Canonical errors pass through, validation failures become invalid-params,
/// anything with a message becomes internal-error with that message, and the
/// rest becomes a generic internal-error with the raw value as `data`.
pub fn normalize(error: anyhow::Error) -> McpError {
    if let Some(mcp) = error.downcast_ref::<McpError>() {
        return mcp.clone();
    }
    if let Some(validation) = error.downcast_ref::<ValidationErrors>() {
        return McpError::invalid_params(validation.summary());
    }
    if let Some(ThrownValue(value)) = error.downcast_ref::<ThrownValue>() {
        return normalize_value(value.clone());
    }
    McpError::internal(error.to_string())
}

/// Normalize a bare JSON value raised in place of an error.
pub fn normalize_value(value: Value) -> McpError {
    match value.get("message").and_then(Value::as_str) {
        Some(message) => McpError::internal(message),
        None => McpError::internal(UNEXPECTED_ERROR_MESSAGE).with_data(value),
    }
}

/// Normalize the payload of a panic caught at the dispatch boundary.
pub fn normalize_panic(payload: Box<dyn Any + Send>) -> McpError {
    let raw = if let Some(s) = payload.downcast_ref::<&str>() {
        Value::String((*s).to_string())
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Value::String(s.clone())
    } else {
        Value::Null
    };
    McpError::internal(UNEXPECTED_ERROR_MESSAGE).with_data(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::contract::Violation;
    use serde_json::json;

    #[test]
    fn test_canonical_error_passes_through() {
        let original = McpError::invalid_request("Unknown tool: nope").with_data(json!({"a": 1}));
        let normalized = normalize(anyhow::Error::new(original.clone()));
        assert_eq!(normalized, original);
    }

    #[test]
    fn test_validation_errors_become_invalid_params() {
        let errors = ValidationErrors::new(vec![
            Violation::new("a", "a string", "missing"),
            Violation::new("b", "a number", "missing"),
        ]);
        let normalized = normalize(anyhow::Error::new(errors));
        assert_eq!(normalized.code, ErrorCode::InvalidParams);
        assert!(normalized.message.contains("a must be a string"));
        assert!(normalized.message.contains("b must be a number"));
    }

    #[test]
    fn test_generic_error_keeps_message() {
        let normalized = normalize(anyhow::anyhow!("connection refused"));
        assert_eq!(normalized.code, ErrorCode::InternalError);
        assert_eq!(normalized.message, "connection refused");
        assert!(normalized.data.is_none());
    }

    #[test]
    fn test_thrown_object_with_message() {
        let normalized = normalize(anyhow::Error::new(ThrownValue(json!({"message": "x"}))));
        assert_eq!(normalized, McpError::internal("x"));
    }

    #[test]
    fn test_thrown_unknown_value() {
        let normalized = normalize_value(Value::Null);
        assert_eq!(normalized.code, ErrorCode::InternalError);
        assert_eq!(normalized.message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(normalized.data, Some(Value::Null));

        let normalized = normalize_value(json!("just a string"));
        assert_eq!(normalized.message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(normalized.data, Some(json!("just a string")));
    }

    #[test]
    fn test_panic_payload() {
        let normalized = normalize_panic(Box::new("boom"));
        assert_eq!(normalized.message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(normalized.data, Some(json!("boom")));
    }

    #[test]
    fn test_error_code_wire_format() {
        let err = McpError::invalid_params("bad");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, json!({"code": -32602, "message": "bad"}));

        let back: McpError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }
}
