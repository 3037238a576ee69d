//! # MCP Server Runtime — protocol core
//!
//! The session/dispatch core of a Model Context Protocol server runtime
//! (`spec.md` §2): the Handler Contract (C4), the Dispatcher (C5), and the
//! Session Manager (C6). Transport adapters (`mcp-http-transport`,
//! `mcp-stdio-transport`) depend on this crate; it depends on nothing
//! transport-specific.
//!
//! ```rust,no_run
//! use mcp_server::{McpDispatcher, McpHandler, RuntimeConfig};
//! use mcp_session_registry::create_default_registry;
//! use std::sync::Arc;
//!
//! struct EchoHandler;
//!
//! #[async_trait::async_trait]
//! impl McpHandler for EchoHandler {
//!     async fn initialize(
//!         &self,
//!         _session_id: &str,
//!         _request_id: &mcp_jsonrpc::RequestId,
//!         _params: Option<serde_json::Value>,
//!     ) -> Result<serde_json::Value, mcp_server::McpError> {
//!         Ok(serde_json::json!({
//!             "protocolVersion": "2024-11-05",
//!             "serverInfo": {"name": "echo-server", "version": "0.1.0"},
//!             "capabilities": {}
//!         }))
//!     }
//! }
//!
//! # async fn build() {
//! let registry = create_default_registry();
//! let dispatcher = McpDispatcher::new(Arc::new(EchoHandler), registry, RuntimeConfig::default());
//! # let _ = dispatcher;
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod prelude;
pub mod session_manager;

pub use config::{ConfigError, RuntimeConfig, RuntimeConfigBuilder, ServerMode, TransportKind};
pub use dispatcher::{Delivery, McpDispatcher};
pub use error::McpError;
pub use handler::{HandlerResult, McpHandler};
pub use session_manager::{
    DeliveryAck, Inbound, ManagerState, OutboundSink, SessionManager, SessionManagerHandle,
};
