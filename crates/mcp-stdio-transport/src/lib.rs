//! # Stdio transport adapter
//!
//! The Frame Codec (C2) and Stdio Transport Adapter (C8): a single MCP
//! session framed as `Content-Length: <N>\r\n\r\n<N bytes>` over stdin/
//! stdout, the LSP-style framing command-line MCP clients speak. Built on
//! [`mcp_server`]'s dispatcher and session manager, same as
//! `mcp-http-transport` — this crate contributes only the wire format and
//! the one-session-per-process plumbing around it.
//!
//! ```rust,no_run
//! use mcp_server::{McpDispatcher, RuntimeConfig};
//! use mcp_session_registry::create_default_registry;
//! use mcp_stdio_transport::StdioTransport;
//! use std::sync::Arc;
//! # struct MyHandler;
//! # #[async_trait::async_trait]
//! # impl mcp_server::McpHandler for MyHandler {
//! #     async fn initialize(&self, _: &str, _: &mcp_jsonrpc::RequestId, _: Option<serde_json::Value>) -> Result<serde_json::Value, mcp_server::McpError> {
//! #         Ok(serde_json::json!({"protocolVersion": "2024-11-05", "capabilities": {}}))
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let registry = create_default_registry();
//!     let dispatcher = Arc::new(McpDispatcher::new(Arc::new(MyHandler), registry.clone(), RuntimeConfig::default()));
//!     StdioTransport::new(dispatcher, registry).run().await
//! }
//! ```

pub mod codec;
pub mod transport;

pub use codec::FrameCodec;
pub use transport::StdioTransport;
