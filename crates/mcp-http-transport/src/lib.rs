//! # SSE transport adapter
//!
//! The SSE Codec (C3) and SSE Transport Adapter (C7) from `spec.md` §4.3/
//! §4.7: `GET {prefix}/sse` opens a long-lived event stream bound to a
//! fresh session; `POST {prefix}/rpc/<id>` is the matching upload half.
//! Built on [`mcp_server`]'s dispatcher and session manager — this crate
//! contributes only the wire format and the hyper plumbing around it.
//!
//! ```rust,no_run
//! use mcp_http_transport::SseTransport;
//! use mcp_server::{McpDispatcher, RuntimeConfig};
//! use mcp_session_registry::create_default_registry;
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
//!     SseTransport::new(RuntimeConfig::default(), dispatcher, registry).run().await
//! }
//! ```

pub mod cors;
pub mod prelude;
pub mod server;
pub mod sse;

pub use cors::CorsLayer;
pub use server::SseTransport;
pub use sse::SseChunk;
