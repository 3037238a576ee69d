//! The Dispatcher (C5) — the protocol core. Implements the method table,
//! the initialization gate, and the delivery-matrix from `spec.md` §4.5 in
//! one match, grounded in the teacher's per-method `JsonRpcHandler` impls
//! (`turul-mcp-server/src/handlers/mod.rs`) and
//! `turul-mcp-json-rpc-server/src/async.rs`'s dispatch shape, collapsed
//! into a single method table per `spec.md` §9's warning against
//! duplicating this logic per transport.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use mcp_jsonrpc::request::RequestParams;
use mcp_jsonrpc::response::{JsonRpcMessage, JsonRpcResponse};
use mcp_jsonrpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, RequestId};
use mcp_session_registry::{PeerInfo, SessionPatch, SessionRecord, SharedSessionRegistry, ToolDescriptor};
use serde_json::{json, Map, Value};
use tracing::{error, warn};

use crate::config::RuntimeConfig;
use crate::error::McpError;
use crate::handler::McpHandler;

/// What a transport adapter should do with the outcome of a request. Both
/// variants carry a full `JsonRpcMessage`; the only difference is whether
/// it travels as a named SSE event. The stdio adapter ignores the
/// distinction and always writes the message as the next frame — this
/// keeps `spec.md` §9's "small tagged variant" guidance literal instead of
/// branching the dispatcher itself on transport kind.
#[derive(Debug, Clone)]
pub enum Delivery {
    Message(JsonRpcMessage),
    NamedMessage(&'static str, JsonRpcMessage),
}

impl Delivery {
    pub fn into_message(self) -> JsonRpcMessage {
        match self {
            Delivery::Message(m) => m,
            Delivery::NamedMessage(_, m) => m,
        }
    }
}

/// The method table plus init-gate plus delivery-matrix: the single
/// purpose-built dispatcher `spec.md` §4.5 calls for.
pub struct McpDispatcher {
    handler: Arc<dyn McpHandler>,
    registry: SharedSessionRegistry,
    config: RuntimeConfig,
}

impl McpDispatcher {
    pub fn new(
        handler: Arc<dyn McpHandler>,
        registry: SharedSessionRegistry,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            handler,
            registry,
            config,
        }
    }

    fn error_delivery(id: RequestId, error: McpError) -> Delivery {
        Delivery::Message(JsonRpcMessage::Error(JsonRpcError::new(
            Some(id),
            error.to_error_object(),
        )))
    }

    fn success_delivery(id: RequestId, result: Value) -> Delivery {
        Delivery::Message(JsonRpcMessage::Response(JsonRpcResponse::success(
            id, result,
        )))
    }

    /// Runs a handler call under `catch_unwind`, mapping a panic onto
    /// `McpError::InternalError` instead of letting it unwind through the
    /// session actor's `tokio::spawn`'d loop (`spec.md` §4.5 point 4,
    /// invariant 5: a handler exception must not take the rest of the
    /// session, or any other session, down with it).
    async fn catch_panic<F, T>(fut: F) -> Result<T, McpError>
    where
        F: Future<Output = Result<T, McpError>>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let detail = Self::panic_message(&payload);
                error!(detail, "handler panicked");
                Err(McpError::InternalError(format!("handler panicked: {detail}")))
            }
        }
    }

    fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
        if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic".to_string()
        }
    }

    /// `handle_request(handler, session_id, request_map) -> {ok, wire_payload} | {err, err_tuple}`
    /// (`spec.md` §4.5). Never fails at the Rust level — every branch
    /// resolves to a `Delivery` the caller forwards to the session's
    /// outbound sink.
    pub async fn handle_request(&self, session_id: &str, request: JsonRpcRequest) -> Delivery {
        let id = request.id.clone();

        let record = match self.registry.lookup(session_id).await {
            Ok(record) => record,
            Err(_) => {
                return Self::error_delivery(
                    id,
                    McpError::InternalError("Session not found".to_string()),
                );
            }
        };

        // notifications/initialized never reaches this path (it has no id
        // and arrives via handle_notification), but `initialize` itself is
        // exempt from the gate below by name.
        let requires_init_check = request.method != "initialize";
        if requires_init_check && !record.initialized {
            return Self::error_delivery(id, McpError::NotInitialized);
        }
        if request.method == "initialize" && record.initialized {
            return Self::error_delivery(
                id,
                McpError::InvalidParams("Session already initialized".to_string()),
            );
        }

        self.dispatch_method(id, &request.method, request.params, session_id, &record)
            .await
    }

    async fn dispatch_method(
        &self,
        id: RequestId,
        method: &str,
        params: Option<RequestParams>,
        session_id: &str,
        record: &SessionRecord,
    ) -> Delivery {
        let params_value = params.as_ref().map(RequestParams::to_value);

        match method {
            "initialize" => self.dispatch_initialize(id, session_id, params_value).await,
            "ping" => {
                let outcome = Self::catch_panic(self.handler.ping(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "tools/list" => self.dispatch_list_tools(id, session_id, record, params_value).await,
            "tools/call" => self.dispatch_call_tool(id, session_id, params_value).await,
            "tools/register" => self.dispatch_register_tool(id, session_id, params_value).await,
            "resources/list" => {
                let outcome =
                    Self::catch_panic(self.handler.list_resources(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "resources/read" => {
                let outcome =
                    Self::catch_panic(self.handler.read_resource(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "resources/templates/list" => {
                let outcome = Self::catch_panic(
                    self.handler.list_resource_templates(session_id, &id, params_value),
                )
                .await;
                Self::from_outcome(id, outcome)
            }
            "resources/subscribe" => {
                let outcome = Self::catch_panic(
                    self.handler.subscribe_resource(session_id, &id, params_value),
                )
                .await;
                Self::from_outcome(id, outcome)
            }
            "resources/unsubscribe" => {
                let outcome = Self::catch_panic(
                    self.handler.unsubscribe_resource(session_id, &id, params_value),
                )
                .await;
                Self::from_outcome(id, outcome)
            }
            "prompts/list" => {
                let outcome =
                    Self::catch_panic(self.handler.list_prompts(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "prompts/get" => {
                let outcome =
                    Self::catch_panic(self.handler.get_prompt(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "completion/complete" | "complete" => {
                let outcome = Self::catch_panic(self.handler.complete(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "logging/setLevel" => {
                let outcome =
                    Self::catch_panic(self.handler.set_log_level(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "sampling/createMessage" => {
                let outcome =
                    Self::catch_panic(self.handler.create_message(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            "roots/list" => {
                let outcome =
                    Self::catch_panic(self.handler.list_roots(session_id, &id, params_value)).await;
                Self::from_outcome(id, outcome)
            }
            other => Self::error_delivery(id, McpError::MethodNotFound(other.to_string())),
        }
    }

    /// Shared tail for the pass-through operations in `spec.md` §4.5's
    /// table: pass a handler success straight through as `result`, map any
    /// domain error onto the wire.
    fn from_outcome(id: RequestId, outcome: Result<Value, McpError>) -> Delivery {
        match outcome {
            Ok(result) => Self::success_delivery(id, result),
            Err(err) => Self::error_delivery(id, err),
        }
    }

    async fn dispatch_initialize(
        &self,
        id: RequestId,
        session_id: &str,
        params: Option<Value>,
    ) -> Delivery {
        let protocol_version = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);

        let protocol_version = match protocol_version {
            None => {
                return Self::error_delivery(
                    id,
                    McpError::ProtocolVersionMismatch(
                        "Missing protocolVersion parameter".to_string(),
                    ),
                )
            }
            Some(v) if !self.config.supports_version(v) => {
                return Self::error_delivery(
                    id,
                    McpError::ProtocolVersionMismatch(format!(
                        "Unsupported protocol version: {v}"
                    )),
                )
            }
            Some(v) => v.to_string(),
        };

        let result = match Self::catch_panic(self.handler.initialize(session_id, &id, params.clone())).await
        {
            Ok(result) => result,
            Err(err) => return Self::error_delivery(id, err),
        };

        let client_info = params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|v| serde_json::from_value::<PeerInfo>(v.clone()).ok());
        let server_info = result
            .get("serverInfo")
            .and_then(|v| serde_json::from_value::<PeerInfo>(v.clone()).ok());
        let capabilities = result.get("capabilities").cloned();

        let patch = SessionPatch {
            initialized: Some(true),
            protocol_version: Some(protocol_version),
            client_info,
            server_info,
            negotiated_capabilities: capabilities,
            custom_tools: None,
        };

        if let Err(err) = self.registry.update(session_id, patch).await {
            warn!(session_id, %err, "failed to record initialize outcome");
            return Self::error_delivery(
                id,
                McpError::InternalError("Failed to persist session state".to_string()),
            );
        }

        Delivery::NamedMessage(
            "InitializeResult",
            JsonRpcMessage::Response(JsonRpcResponse::success(id, result)),
        )
    }

    async fn dispatch_list_tools(
        &self,
        id: RequestId,
        session_id: &str,
        record: &SessionRecord,
        params: Option<Value>,
    ) -> Delivery {
        let result = match Self::catch_panic(self.handler.list_tools(session_id, &id, params)).await {
            Ok(result) => result,
            Err(err) => return Self::error_delivery(id, err),
        };

        let mut tools = result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for descriptor in record.custom_tools.values() {
            if let Ok(value) = serde_json::to_value(descriptor) {
                tools.push(value);
            }
        }

        Self::success_delivery(id, json!({ "tools": tools }))
    }

    async fn dispatch_call_tool(
        &self,
        id: RequestId,
        session_id: &str,
        params: Option<Value>,
    ) -> Delivery {
        let name = match params.as_ref().and_then(|p| p.get("name")).and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                return Self::error_delivery(
                    id,
                    McpError::InvalidParams("Missing tool name".to_string()),
                )
            }
        };
        let arguments = params.as_ref().and_then(|p| p.get("arguments")).cloned();

        let result = match Self::catch_panic(self.handler.call_tool(session_id, &id, &name, arguments)).await
        {
            Ok(result) => result,
            Err(err) => return Self::error_delivery(id, err),
        };

        let shaped = if result.get("content").is_some() {
            result
        } else {
            json!({ "content": [{ "type": "text", "text": result.to_string() }] })
        };

        Self::success_delivery(id, shaped)
    }

    async fn dispatch_register_tool(
        &self,
        id: RequestId,
        session_id: &str,
        params: Option<Value>,
    ) -> Delivery {
        if !self.config.allow_dynamic_tool_registration {
            return Self::error_delivery(
                id,
                McpError::MethodNotFound("tools/register".to_string()),
            );
        }

        let name = match params.as_ref().and_then(|p| p.get("name")).and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Self::error_delivery(
                    id,
                    McpError::InvalidParams("Tool registration requires a non-empty name".to_string()),
                )
            }
        };

        let descriptor = ToolDescriptor {
            name: name.clone(),
            description: params
                .as_ref()
                .and_then(|p| p.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string),
            input_schema: params
                .as_ref()
                .and_then(|p| p.get("inputSchema"))
                .cloned()
                .unwrap_or(Value::Object(Map::new())),
        };

        let mut custom_tools = std::collections::HashMap::new();
        custom_tools.insert(name, descriptor);

        if let Err(err) = self
            .registry
            .update(
                session_id,
                SessionPatch {
                    custom_tools: Some(custom_tools),
                    ..Default::default()
                },
            )
            .await
        {
            warn!(session_id, %err, "tools/register could not update session");
            return Self::error_delivery(
                id,
                McpError::InternalError("Failed to register tool".to_string()),
            );
        }

        Self::success_delivery(id, json!({ "registered": true }))
    }

    /// `handle_notification(handler, session_id, notification_map) -> ok`
    /// (always). Spawns the handler call so it can never block or fail
    /// back to the client; silently drops notifications for unknown
    /// sessions (`spec.md` §4.5).
    pub async fn handle_notification(&self, session_id: &str, notification: JsonRpcNotification) {
        let record = match self.registry.lookup(session_id).await {
            Ok(record) => record,
            Err(_) => return,
        };

        let handler = self.handler.clone();
        let session_id = session_id.to_string();
        let method = notification.method.clone();
        let params = notification.params.as_ref().map(RequestParams::to_value);

        tokio::spawn(async move {
            if let Err(err) =
                Self::catch_panic(handler.notification(&session_id, &method, params, &record)).await
            {
                error!(session_id, method, %err, "notification handler failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_session_registry::{InMemorySessionRegistry, SessionRecord, Transport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHandler {
        initialize_calls: AtomicUsize,
    }

    #[async_trait]
    impl McpHandler for StubHandler {
        async fn initialize(
            &self,
            _session_id: &str,
            _request_id: &RequestId,
            _params: Option<Value>,
        ) -> Result<Value, McpError> {
            self.initialize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "test", "version": "0"},
                "capabilities": {}
            }))
        }

        async fn call_tool(
            &self,
            _session_id: &str,
            _request_id: &RequestId,
            name: &str,
            arguments: Option<Value>,
        ) -> Result<Value, McpError> {
            if name == "echo" {
                let message = arguments
                    .as_ref()
                    .and_then(|a| a.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(json!({ "content": [{"type": "text", "text": message}] }))
            } else {
                Err(McpError::ToolNotFound(name.to_string()))
            }
        }
    }

    fn build(registry: SharedSessionRegistry) -> McpDispatcher {
        McpDispatcher::new(
            Arc::new(StubHandler {
                initialize_calls: AtomicUsize::new(0),
            }),
            registry,
            RuntimeConfig::default(),
        )
    }

    #[tokio::test]
    async fn not_initialized_gate_blocks_other_methods() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        registry
            .register("s1".to_string(), SessionRecord::new(Transport::Stdio, None))
            .await
            .unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(RequestId::Number(9), "tools/list".to_string(), None);
        let delivery = dispatcher.handle_request("s1", request).await;

        match delivery.into_message() {
            JsonRpcMessage::Error(err) => {
                assert_eq!(err.error.code, -32000);
                assert_eq!(err.error.message, "Session not initialized");
            }
            JsonRpcMessage::Response(_) => panic!("expected error"),
        }
        assert!(!registry.lookup("s1").await.unwrap().initialized);
    }

    #[tokio::test]
    async fn initialize_with_bad_version_is_rejected() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        registry
            .register("s1".to_string(), SessionRecord::new(Transport::Stdio, None))
            .await
            .unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(
            RequestId::Number(1),
            "initialize".to_string(),
            Some(RequestParams::Object(
                [("protocolVersion".to_string(), json!("1999-01-01"))]
                    .into_iter()
                    .collect(),
            )),
        );
        let delivery = dispatcher.handle_request("s1", request).await;

        match delivery.into_message() {
            JsonRpcMessage::Error(err) => {
                assert_eq!(err.error.code, -32001);
                assert!(err.error.message.contains("Unsupported protocol version"));
            }
            JsonRpcMessage::Response(_) => panic!("expected error"),
        }
        assert!(!registry.lookup("s1").await.unwrap().initialized);
    }

    #[tokio::test]
    async fn successful_initialize_is_delivered_as_named_event_and_updates_record() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        registry
            .register("s1".to_string(), SessionRecord::new(Transport::Sse, None))
            .await
            .unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(
            RequestId::Number(1),
            "initialize".to_string(),
            Some(RequestParams::Object(
                [
                    ("protocolVersion".to_string(), json!("2024-11-05")),
                    (
                        "clientInfo".to_string(),
                        json!({"name": "c", "version": "0"}),
                    ),
                ]
                .into_iter()
                .collect(),
            )),
        );
        let delivery = dispatcher.handle_request("s1", request).await;

        assert!(matches!(delivery, Delivery::NamedMessage("InitializeResult", _)));
        let record = registry.lookup("s1").await.unwrap();
        assert!(record.initialized);
        assert_eq!(record.protocol_version.as_deref(), Some("2024-11-05"));
        assert_eq!(record.client_info.as_ref().map(|c| c.name.as_str()), Some("c"));
    }

    #[tokio::test]
    async fn tool_call_wraps_non_content_result() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        let mut record = SessionRecord::new(Transport::Stdio, None);
        record.initialized = true;
        registry.register("s1".to_string(), record).await.unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(
            RequestId::Number(2),
            "tools/call".to_string(),
            Some(RequestParams::Object(
                [
                    ("name".to_string(), json!("echo")),
                    ("arguments".to_string(), json!({"message": "hi"})),
                ]
                .into_iter()
                .collect(),
            )),
        );
        let delivery = dispatcher.handle_request("s1", request).await;

        match delivery.into_message() {
            JsonRpcMessage::Response(resp) => {
                let value = resp.result.as_value().cloned().unwrap();
                assert_eq!(value["content"][0]["text"], json!("hi"));
            }
            JsonRpcMessage::Error(_) => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        let mut record = SessionRecord::new(Transport::Stdio, None);
        record.initialized = true;
        registry.register("s1".to_string(), record).await.unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(RequestId::Number(3), "nonexistent/method".to_string(), None);
        let delivery = dispatcher.handle_request("s1", request).await;
        match delivery.into_message() {
            JsonRpcMessage::Error(err) => assert_eq!(err.error.code, -32601),
            JsonRpcMessage::Response(_) => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn tools_register_gated_by_config_flag() {
        let registry: SharedSessionRegistry = Arc::new(InMemorySessionRegistry::new());
        let mut record = SessionRecord::new(Transport::Stdio, None);
        record.initialized = true;
        registry.register("s1".to_string(), record).await.unwrap();
        let dispatcher = build(registry.clone());

        let request = JsonRpcRequest::new(
            RequestId::Number(4),
            "tools/register".to_string(),
            Some(RequestParams::Object(
                [("name".to_string(), json!("custom"))].into_iter().collect(),
            )),
        );
        let delivery = dispatcher.handle_request("s1", request).await;
        match delivery.into_message() {
            JsonRpcMessage::Error(err) => assert_eq!(err.error.code, -32601),
            JsonRpcMessage::Response(_) => panic!("expected error, registration disabled by default"),
        }
    }
}
