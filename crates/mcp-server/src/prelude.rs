//! Convenient re-exports for implementing an [`crate::McpHandler`] and
//! wiring it into a dispatcher.
//!
//! ```rust
//! use mcp_server::prelude::*;
//! ```

pub use crate::{
    Delivery, HandlerResult, Inbound, McpDispatcher, McpError, McpHandler, OutboundSink,
    RuntimeConfig, SessionManager, SessionManagerHandle,
};

pub use async_trait::async_trait;
pub use mcp_jsonrpc::RequestId;
pub use mcp_session_registry::{SessionRecord, SharedSessionRegistry};
pub use serde_json::{json, Value};
pub use std::sync::Arc;
