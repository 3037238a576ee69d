//! The Handler Contract (C4): one polymorphic trait covering every
//! capability `spec.md` §4.4 lists, each with a "method not found" default
//! so a concrete handler only implements what it actually supports — the
//! single-interface analogue of the teacher's per-capability traits
//! (`McpTool`, `McpResource`, `McpPrompt`, `McpSampling`, ...).
//!
//! A handler is pure with respect to session state: it never touches the
//! Session Registry itself. The dispatcher reads the record before the call
//! and applies any resulting state change after, based solely on the
//! handler's return value.

use async_trait::async_trait;
use mcp_jsonrpc::RequestId;
use mcp_session_registry::SessionRecord;
use serde_json::Value;

use crate::error::McpError;

/// The result a capability method hands back to the dispatcher: either a
/// JSON-serializable map to embed as the response `result`, or a domain
/// error the dispatcher converts to a JSON-RPC error object.
pub type HandlerResult = Result<Value, McpError>;

#[async_trait]
pub trait McpHandler: Send + Sync {
    /// Negotiate protocol version/capabilities and return the
    /// `InitializeResult` payload. The dispatcher has already validated
    /// `protocolVersion` before calling this — a handler only needs to
    /// produce `serverInfo`/`capabilities`.
    async fn initialize(
        &self,
        session_id: &str,
        request_id: &RequestId,
        params: Option<Value>,
    ) -> HandlerResult;

    /// `ping` — the dispatcher ignores the content and always responds
    /// with an empty object, so the default is sufficient for almost every
    /// handler.
    async fn ping(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Ok(serde_json::json!({}))
    }

    async fn list_tools(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("tools/list".to_string()))
    }

    async fn call_tool(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        name: &str,
        _arguments: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::ToolNotFound(name.to_string()))
    }

    async fn list_resources(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("resources/list".to_string()))
    }

    async fn read_resource(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("resources/read".to_string()))
    }

    async fn list_resource_templates(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound(
            "resources/templates/list".to_string(),
        ))
    }

    async fn subscribe_resource(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("resources/subscribe".to_string()))
    }

    async fn unsubscribe_resource(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound(
            "resources/unsubscribe".to_string(),
        ))
    }

    async fn list_prompts(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("prompts/list".to_string()))
    }

    async fn get_prompt(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("prompts/get".to_string()))
    }

    async fn complete(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("completion/complete".to_string()))
    }

    async fn set_log_level(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("logging/setLevel".to_string()))
    }

    async fn create_message(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound(
            "sampling/createMessage".to_string(),
        ))
    }

    async fn list_roots(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Err(McpError::MethodNotFound("roots/list".to_string()))
    }

    /// Fire-and-forget notification delivery. Errors are logged by the
    /// dispatcher, never reported to the client (`spec.md` §4.5).
    async fn notification(
        &self,
        _session_id: &str,
        _method: &str,
        _params: Option<Value>,
        _record: &SessionRecord,
    ) -> Result<(), McpError> {
        Ok(())
    }
}
