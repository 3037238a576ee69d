//! Parsing raw JSON text into a [`JsonRpcRequest`] or [`JsonRpcNotification`].
//!
//! Both transport adapters (SSE's POST body, stdio's framed payload) funnel
//! through this module so the parse-error/invalid-request semantics in
//! `spec.md` §7 are enforced in exactly one place.

use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::types::RequestId;

/// An inbound JSON-RPC message, before we know whether it carries an `id`.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Parse a single JSON-RPC message from raw text.
///
/// Returns a fully-formed [`JsonRpcError`] (not just an error code) so
/// callers can serialize it directly as the wire response: `-32700` for
/// malformed JSON, `-32600` for well-formed JSON that isn't a valid
/// JSON-RPC request/notification shape.
pub fn parse_message(raw: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| JsonRpcError::parse_error())?;
    parse_value(value)
}

/// Parse an already-decoded JSON value (used when the transport has already
/// deserialized the body, e.g. an HTTP framework's JSON extractor).
pub fn parse_value(value: Value) -> Result<IncomingMessage, JsonRpcError> {
    let obj = value
        .as_object()
        .ok_or_else(|| JsonRpcError::invalid_request(None))?;

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(crate::JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request(None));
    }

    let method = match obj.get("method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => return Err(JsonRpcError::invalid_request(None)),
    };

    let params = match obj.get("params") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(RequestParams::Object(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Some(Value::Array(arr)) => Some(RequestParams::Array(arr.clone())),
        Some(_) => return Err(JsonRpcError::invalid_request(None)),
    };

    match obj.get("id") {
        None => Ok(IncomingMessage::Notification(JsonRpcNotification::new(
            method, params,
        ))),
        Some(Value::Number(n)) if n.is_i64() => Ok(IncomingMessage::Request(JsonRpcRequest::new(
            RequestId::Number(n.as_i64().unwrap()),
            method,
            params,
        ))),
        Some(Value::String(s)) => Ok(IncomingMessage::Request(JsonRpcRequest::new(
            RequestId::String(s.clone()),
            method,
            params,
        ))),
        Some(_) => Err(JsonRpcError::invalid_request(None)),
    }
}

impl JsonRpcError {
    /// Build the `-32700` parse-error body with no associated request id,
    /// as required whenever a transport cannot even extract an id.
    pub fn parse_error_body() -> Value {
        serde_json::to_value(JsonRpcError::new(None, JsonRpcErrorObject::parse_error(None)))
            .expect("JsonRpcError always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_request_with_object_params() {
        let raw = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "ping",
            "params": {"a": 1}
        })
        .to_string();

        match parse_message(&raw).unwrap() {
            IncomingMessage::Request(req) => {
                assert_eq!(req.method, "ping");
                assert_eq!(req.id, RequestId::Number(1));
            }
            IncomingMessage::Notification(_) => panic!("expected request"),
        }
    }

    #[test]
    fn parses_notification_without_id() {
        let raw = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        match parse_message(&raw).unwrap() {
            IncomingMessage::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
            IncomingMessage::Request(_) => panic!("expected notification"),
        }
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.error.code, -32700);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        let raw = json!({"jsonrpc": "2.0", "id": 1}).to_string();
        let err = parse_message(&raw).unwrap_err();
        assert_eq!(err.error.code, -32600);
    }

    #[test]
    fn wrong_jsonrpc_version_is_invalid_request() {
        let raw = json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}).to_string();
        let err = parse_message(&raw).unwrap_err();
        assert_eq!(err.error.code, -32600);
    }
}
