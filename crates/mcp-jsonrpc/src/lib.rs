//! # JSON-RPC 2.0 message types
//!
//! A pure, transport-agnostic JSON-RPC 2.0 implementation: request, response,
//! notification and error types, plus the parsing that turns raw wire bytes
//! into one of them. No transport-specific code lives here — the session
//! runtime and the transport adapters depend on this crate, not the other
//! way around.

pub mod error;
pub mod notification;
pub mod parse;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use notification::JsonRpcNotification;
pub use parse::{parse_message, parse_value, IncomingMessage};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, ResponseResult};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    
    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}