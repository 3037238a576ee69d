//! The Stdio Transport Adapter (C8): one session per process, framed over
//! stdin/stdout with [`FrameCodec`].
//!
//! Mirrors the actor wiring `mcp-http-transport`'s `SseTransport` uses
//! (owner-liveness `Notify`, an [`OutboundSink`] that turns a `Delivery`
//! into wire bytes, handing everything else to [`SessionManager`]) but with
//! a single session minted once at startup instead of one per incoming
//! connection — there is exactly one peer on the other end of stdio.

use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use mcp_jsonrpc::parse::{parse_message, IncomingMessage};
use mcp_server::{Delivery, Inbound, McpDispatcher, OutboundSink, SessionManager};
use mcp_session_registry::{OwnerHandle, SessionRecord, SharedSessionRegistry, Transport};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;

/// Resolves once the stdin side has hit EOF — the only signal this
/// transport has that its one peer has gone away.
struct StdioOwner(Arc<Notify>);

#[async_trait]
impl OwnerHandle for StdioOwner {
    async fn closed(&self) {
        self.0.notified().await;
    }
}

/// Serializes writes onto the outbound half through the frame codec. A
/// `tokio::sync` mutex rather than a plain one since `send` holds it across
/// an `.await`. Generic over the writer so the same sink drives real stdout
/// in production and an in-memory duplex half in tests.
struct StdioSink<W> {
    writer: Mutex<FramedWrite<W, FrameCodec>>,
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutboundSink for StdioSink<W> {
    async fn send(&self, delivery: Delivery) -> std::io::Result<()> {
        let message = delivery.into_message();
        let text = serde_json::to_string(&message)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut writer = self.writer.lock().await;
        writer.send(text).await
    }
}

/// Drives exactly one MCP session over stdin/stdout for the lifetime of the
/// process.
pub struct StdioTransport {
    dispatcher: Arc<McpDispatcher>,
    registry: SharedSessionRegistry,
}

impl StdioTransport {
    pub fn new(dispatcher: Arc<McpDispatcher>, registry: SharedSessionRegistry) -> Self {
        Self { dispatcher, registry }
    }

    /// Registers the session, spawns its manager, then reads frames from
    /// stdin until EOF. Never writes anything but framed JSON-RPC to
    /// stdout — diagnostics go through `tracing`, which this crate assumes
    /// is configured to write to stderr or a file, not stdout.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_io(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// The actual adapter loop, generic over its byte streams so tests can
    /// drive it over an in-memory `tokio::io::duplex` pair instead of the
    /// process's real stdin/stdout.
    pub async fn run_io<R, W>(self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let session_id = uuid::Uuid::new_v4().to_string();
        let closed = Arc::new(Notify::new());
        let owner: Arc<dyn OwnerHandle> = Arc::new(StdioOwner(closed.clone()));

        self.registry
            .register(session_id.clone(), SessionRecord::new(Transport::Stdio, Some(owner)))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e.to_string()))?;

        let framed_writer = FramedWrite::new(writer, FrameCodec::new());
        let sink: Arc<dyn OutboundSink> = Arc::new(StdioSink { writer: Mutex::new(framed_writer) });

        let handle = SessionManager::spawn(
            session_id.clone(),
            self.dispatcher.clone(),
            self.registry.clone(),
            sink,
        );

        info!(session_id = %session_id, "stdio session started");

        let mut framed_reader = FramedRead::new(reader, FrameCodec::new());

        while let Some(frame) = framed_reader.next().await {
            let raw = match frame {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "stdio frame read error, ending session");
                    break;
                }
            };

            match parse_message(&raw) {
                Ok(IncomingMessage::Request(request)) => {
                    let _ = handle.dispatch(Inbound::Request(request, None));
                }
                Ok(IncomingMessage::Notification(notification)) => {
                    let _ = handle.dispatch(Inbound::Notification(notification));
                }
                Err(parse_error) => {
                    let _ = handle.dispatch(Inbound::SendMessage(Delivery::Message(
                        parse_error.into(),
                    )));
                }
            }
        }

        debug!(session_id = %session_id, "stdin reached EOF");
        closed.notify_one();
        let _ = handle.dispatch(Inbound::Shutdown);

        Ok(())
    }
}
