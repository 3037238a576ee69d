//! Convenient re-exports for wiring the SSE transport adapter into a
//! binary.
//!
//! ```rust
//! use mcp_http_transport::prelude::*;
//! ```

pub use crate::{CorsLayer, SseChunk, SseTransport};
pub use mcp_server::prelude::*;
