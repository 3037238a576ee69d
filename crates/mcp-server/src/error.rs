//! Domain errors a [`crate::handler::McpHandler`] can return, and their
//! mapping onto the JSON-RPC error taxonomy (`spec.md` §7).
//!
//! Handlers return `McpError`, never `JsonRpcErrorObject` directly — the
//! dispatcher owns the protocol-level conversion, mirroring the teacher's
//! `ToJsonRpcError` split between domain and wire errors.

use mcp_jsonrpc::error::JsonRpcErrorObject;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum McpError {
    #[error("Parse error")]
    ParseError,

    #[error("Invalid Request")]
    InvalidRequest,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Session not initialized")]
    NotInitialized,

    #[error("Unknown or expired session ID")]
    UnknownOrExpiredSession,

    #[error("Unsupported protocol version: {0}")]
    ProtocolVersionMismatch(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

impl McpError {
    pub fn code(&self) -> i64 {
        match self {
            McpError::ParseError => -32700,
            McpError::InvalidRequest => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidParams(_) => -32602,
            McpError::InternalError(_) => -32603,
            McpError::NotInitialized => -32000,
            McpError::UnknownOrExpiredSession => -32000,
            McpError::ProtocolVersionMismatch(_) => -32001,
            McpError::ToolNotFound(_) => -32002,
        }
    }

    /// Convert into the wire error object the dispatcher embeds in a
    /// `JsonRpcError` response.
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        let data = match self {
            McpError::InternalError(detail) if !detail.is_empty() => {
                Some(Value::String(detail.clone()))
            }
            _ => None,
        };
        JsonRpcErrorObject {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_taxonomy() {
        assert_eq!(McpError::ParseError.code(), -32700);
        assert_eq!(McpError::InvalidRequest.code(), -32600);
        assert_eq!(McpError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(McpError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(McpError::InternalError("x".into()).code(), -32603);
        assert_eq!(McpError::NotInitialized.code(), -32000);
        assert_eq!(McpError::UnknownOrExpiredSession.code(), -32000);
        assert_eq!(McpError::ProtocolVersionMismatch("x".into()).code(), -32001);
        assert_eq!(McpError::ToolNotFound("x".into()).code(), -32002);
    }

    #[test]
    fn not_initialized_message_matches_spec_wording() {
        assert_eq!(McpError::NotInitialized.to_string(), "Session not initialized");
    }
}
