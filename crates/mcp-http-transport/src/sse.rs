//! The SSE Codec (C3): formatting outbound chunks and the bootstrap
//! `endpoint` event (`spec.md` §4.3/§6.1).
//!
//! Grounded in the teacher's `SseEvent::format()`
//! (`turul-http-mcp-server/src/sse.rs`), narrowed from its four generic
//! variants (`Connected`/`Data`/`Error`/`KeepAlive`) down to the two shapes
//! `spec.md` actually names — a named event and an unnamed `data:` message —
//! plus the one-shot bootstrap chunk every SSE stream opens with.

use mcp_jsonrpc::response::JsonRpcMessage;

/// One outbound SSE chunk. `Named` carries an `event:` line (used exactly
/// once per session for the bootstrap `endpoint` event and once for
/// `InitializeResult`); `Unnamed` is every other JSON-RPC response, error,
/// or notification delivered over the stream.
#[derive(Debug, Clone)]
pub enum SseChunk {
    Named { event: &'static str, data: String },
    Unnamed { data: String },
}

impl SseChunk {
    /// The first chunk on any newly opened stream: `spec.md` §4.3/§6.1's
    /// `event: endpoint\ndata: <rpc_path>\n\n`, carrying the relative URL
    /// the client must POST subsequent requests to.
    pub fn endpoint(rpc_path: &str) -> Self {
        SseChunk::Named {
            event: "endpoint",
            data: rpc_path.to_string(),
        }
    }

    pub fn named_message(event: &'static str, message: &JsonRpcMessage) -> Self {
        SseChunk::Named {
            event,
            data: serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    pub fn message(message: &JsonRpcMessage) -> Self {
        SseChunk::Unnamed {
            data: serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    /// Render the wire bytes: `event: <name>\ndata: <json>\n\n` or
    /// `data: <json>\n\n`. Neither `data` value here can legitimately
    /// contain a newline (it's always a bare path or a single-line
    /// JSON-serialized payload), so no line-folding is needed.
    pub fn format(&self) -> String {
        match self {
            SseChunk::Named { event, data } => format!("event: {event}\ndata: {data}\n\n"),
            SseChunk::Unnamed { data } => format!("data: {data}\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_jsonrpc::{JsonRpcResponse, RequestId};
    use serde_json::json;

    #[test]
    fn endpoint_chunk_matches_spec_bootstrap_shape() {
        let chunk = SseChunk::endpoint("/rpc/abc-123");
        assert_eq!(chunk.format(), "event: endpoint\ndata: /rpc/abc-123\n\n");
    }

    #[test]
    fn unnamed_message_has_no_event_line() {
        let message = JsonRpcMessage::Response(JsonRpcResponse::success(
            RequestId::Number(1),
            json!({"ok": true}),
        ));
        let formatted = SseChunk::message(&message).format();
        assert!(formatted.starts_with("data: "));
        assert!(formatted.ends_with("\n\n"));
        assert!(!formatted.contains("event:"));
    }

    #[test]
    fn named_message_carries_requested_event_name() {
        let message = JsonRpcMessage::Response(JsonRpcResponse::success(
            RequestId::Number(1),
            json!({"protocolVersion": "2024-11-05"}),
        ));
        let formatted = SseChunk::named_message("InitializeResult", &message).format();
        assert!(formatted.starts_with("event: InitializeResult\ndata: "));
    }
}
