//! A minimal MCP server exercising the handler contract: one `echo` tool,
//! wired up over either transport this workspace provides.
//!
//! ```text
//! cargo run -p echo-server -- --transport sse
//! cargo run -p echo-server -- --transport stdio
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use mcp_jsonrpc::RequestId;
use mcp_server::{HandlerResult, McpDispatcher, McpError, McpHandler, RuntimeConfig, TransportKind};
use mcp_session_registry::create_default_registry;
use serde_json::{json, Value};
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransportArg {
    Sse,
    Stdio,
}

#[derive(Parser, Debug)]
#[command(name = "echo-server", about = "Demo MCP server with one echo tool")]
struct Args {
    /// Which transport adapter to run. Overrides `MCP_TRANSPORT` if given.
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,

    #[arg(long, default_value = "127.0.0.1")]
    bind_host: String,

    #[arg(long, default_value_t = 8080)]
    bind_port: u16,
}

/// Implements `tools/list` and `tools/call` with a single tool that returns
/// its input back as text content. Everything else falls through to
/// [`McpHandler`]'s defaults.
struct EchoHandler;

#[async_trait]
impl McpHandler for EchoHandler {
    async fn initialize(
        &self,
        session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        info!(session_id, "initializing echo-server session");
        Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "echo-server",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }))
    }

    async fn list_tools(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        _params: Option<Value>,
    ) -> HandlerResult {
        Ok(json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Returns the provided message unchanged",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" }
                        },
                        "required": ["message"]
                    }
                }
            ]
        }))
    }

    async fn call_tool(
        &self,
        _session_id: &str,
        _request_id: &RequestId,
        name: &str,
        arguments: Option<Value>,
    ) -> HandlerResult {
        if name != "echo" {
            return Err(McpError::ToolNotFound(name.to_string()));
        }

        let message = arguments
            .as_ref()
            .and_then(|args| args.get("message"))
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::InvalidParams("missing required field 'message'".to_string()))?;

        Ok(json!({
            "content": [
                { "type": "text", "text": message }
            ]
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = RuntimeConfig::from_env();
    config.bind_host = args.bind_host;
    config.bind_port = args.bind_port;
    if let Some(transport) = args.transport {
        config.transport_select = match transport {
            TransportArg::Sse => TransportKind::Sse,
            TransportArg::Stdio => TransportKind::Stdio,
        };
    }

    let registry = create_default_registry();
    let dispatcher = Arc::new(McpDispatcher::new(
        Arc::new(EchoHandler),
        registry.clone(),
        config.clone(),
    ));

    match config.transport_select {
        TransportKind::Sse => {
            info!(host = %config.bind_host, port = config.bind_port, "starting echo-server over SSE");
            mcp_http_transport::SseTransport::new(config, dispatcher, registry)
                .run()
                .await?;
        }
        TransportKind::Stdio => {
            info!("starting echo-server over stdio");
            mcp_stdio_transport::StdioTransport::new(dispatcher, registry)
                .run()
                .await?;
        }
    }

    Ok(())
}
