//! The Session Manager (C6): one actor per session, holding exclusive
//! ownership of the outbound stream so every write — dispatcher response,
//! server-initiated notification, or named `InitializeResult` event — goes
//! out through a single serialized path. Grounded in the teacher's
//! `turul-mcp-server/src/session.rs` `SessionContext` (the per-session
//! handle transport adapters hold) generalized from its `tokio`-task-per-
//! connection shape into the explicit `Opening`/`Ready`/`Terminating`
//! state machine `spec.md` §4.6 names.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_jsonrpc::{JsonRpcNotification, JsonRpcRequest};
use mcp_session_registry::SharedSessionRegistry;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatcher::{Delivery, McpDispatcher};

/// Where a `Delivery` actually goes. One implementation per transport
/// (SSE chunk writer, stdio frame writer); the session manager never
/// branches on which.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, delivery: Delivery) -> std::io::Result<()>;
}

/// Reports back whether a request's `Delivery` actually made it out through
/// the session's `OutboundSink`. `Err(delivery)` carries the `Delivery` that
/// failed to send, so a caller that needs a synchronous answer (the SSE
/// adapter's `POST` handler, falling back to an HTTP 500 per `spec.md`
/// §4.5's "no live owner found" case) can inspect what was being sent.
pub type DeliveryAck = tokio::sync::oneshot::Sender<Result<(), Delivery>>;

/// What can be dropped into a session's mailbox.
pub enum Inbound {
    /// `ack` is `Some` when the caller wants to know whether the resulting
    /// `Delivery` reached the outbound sink before it moves on — stdio never
    /// needs this (the frame write already happens on the same task), so
    /// it always passes `None`.
    Request(JsonRpcRequest, Option<DeliveryAck>),
    Notification(JsonRpcNotification),
    /// A server-originated message (e.g. a notification the handler
    /// pushes outside of a request/response cycle) to deliver as-is.
    SendMessage(Delivery),
    Shutdown,
}

/// `spec.md` §4.6's three states. `Opening` exists only between
/// registration and the first successful poll of the mailbox; in
/// practice the actor moves to `Ready` on its very first loop iteration,
/// since registration already happened before `spawn` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Opening,
    Ready,
    Terminating,
}

/// A cheaply cloneable handle transport adapters use to feed a session's
/// mailbox. Dropping every handle closes the mailbox and ends the actor.
#[derive(Clone)]
pub struct SessionManagerHandle {
    session_id: String,
    sender: mpsc::UnboundedSender<Inbound>,
}

impl SessionManagerHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Enqueue an inbound item. Fails only if the actor has already torn
    /// itself down (mailbox closed); callers treat that the same as an
    /// unknown session.
    pub fn dispatch(&self, inbound: Inbound) -> Result<(), Inbound> {
        self.sender.send(inbound).map_err(|e| e.0)
    }
}

/// The actor body. `spawn` starts it and immediately returns a handle;
/// there is no separate "manager" value to hold onto afterwards.
pub struct SessionManager;

impl SessionManager {
    /// Start the actor for `session_id`. The caller must have already
    /// registered the session in `registry` before calling this — the
    /// manager's job is ordering inbound/outbound traffic, not session
    /// bookkeeping.
    pub fn spawn(
        session_id: String,
        dispatcher: Arc<McpDispatcher>,
        registry: SharedSessionRegistry,
        sink: Arc<dyn OutboundSink>,
    ) -> SessionManagerHandle {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Inbound>();

        let handle = SessionManagerHandle {
            session_id: session_id.clone(),
            sender,
        };

        tokio::spawn(async move {
            let mut state = ManagerState::Ready;
            debug!(session_id = %session_id, "session manager started");

            while state == ManagerState::Ready {
                let Some(inbound) = receiver.recv().await else {
                    break;
                };

                match inbound {
                    Inbound::Request(request, ack) => {
                        let delivery = dispatcher.handle_request(&session_id, request).await;
                        let delivery_for_ack = ack.as_ref().map(|_| delivery.clone());
                        let send_failed = sink.send(delivery).await.is_err();
                        if let Some(ack) = ack {
                            let payload = if send_failed {
                                Err(delivery_for_ack.expect("ack present implies delivery_for_ack captured"))
                            } else {
                                Ok(())
                            };
                            let _ = ack.send(payload);
                        }
                        if send_failed {
                            warn!(session_id = %session_id, "outbound write failed, tearing down session");
                            state = ManagerState::Terminating;
                        }
                    }
                    Inbound::Notification(notification) => {
                        dispatcher.handle_notification(&session_id, notification).await;
                    }
                    Inbound::SendMessage(delivery) => {
                        if sink.send(delivery).await.is_err() {
                            warn!(session_id = %session_id, "outbound write failed, tearing down session");
                            state = ManagerState::Terminating;
                        }
                    }
                    Inbound::Shutdown => {
                        state = ManagerState::Terminating;
                    }
                }
            }

            registry.unregister(&session_id).await;
            debug!(session_id = %session_id, "session manager stopped");
        });

        handle
    }
}
