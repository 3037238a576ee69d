//! Session Registry trait and the session record it manages.
//!
//! Mirrors the shape of `SessionStorage` in the teacher's session-storage
//! crate, trimmed to the operations an in-process, non-persistent registry
//! actually needs: register/unregister/lookup/update/list, plus owner
//! liveness monitoring. Durable backends are out of scope here — a
//! restarted process has no live owners to monitor anyway.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The transport a session is bound to. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Sse,
    Stdio,
}

/// `{name, version}` captured from an `initialize` request or result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub name: String,
    pub version: String,
}

/// The minimal shape `tools/register` needs: enough for the dispatcher to
/// list and route to a dynamically-registered tool without reproducing a
/// full JSON-schema builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// A handle to whatever is driving outbound delivery for a session — the
/// SSE stream's body sender, or the stdio writer task. The registry doesn't
/// care which; it only needs to know when the owner is gone so it can stop
/// monitoring a dead session.
#[async_trait]
pub trait OwnerHandle: Send + Sync {
    /// Resolves once the owner has disconnected (socket closed, EOF
    /// reached, writer task exited). Must resolve exactly once; the
    /// registry awaits it a single time per registration.
    async fn closed(&self);
}

/// The session record `spec.md` §3 defines, keyed by `session_id` in the
/// registry's map.
#[derive(Clone)]
pub struct SessionRecord {
    pub transport: Transport,
    pub owner: Option<Arc<dyn OwnerHandle>>,
    pub initialized: bool,
    pub protocol_version: Option<String>,
    pub client_info: Option<PeerInfo>,
    pub server_info: Option<PeerInfo>,
    pub negotiated_capabilities: Option<Value>,
    pub custom_tools: HashMap<String, ToolDescriptor>,
    pub created_at: u64,
    pub last_activity: u64,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("transport", &self.transport)
            .field("owner", &self.owner.as_ref().map(|_| "<owner>"))
            .field("initialized", &self.initialized)
            .field("protocol_version", &self.protocol_version)
            .field("client_info", &self.client_info)
            .field("server_info", &self.server_info)
            .field("negotiated_capabilities", &self.negotiated_capabilities)
            .field("custom_tools", &self.custom_tools.keys().collect::<Vec<_>>())
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl SessionRecord {
    /// A fresh, not-yet-initialized record for a newly accepted transport
    /// connection.
    pub fn new(transport: Transport, owner: Option<Arc<dyn OwnerHandle>>) -> Self {
        let now = now_millis();
        Self {
            transport,
            owner,
            initialized: false,
            protocol_version: None,
            client_info: None,
            server_info: None,
            negotiated_capabilities: None,
            custom_tools: HashMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = now_millis();
    }
}

/// A partial update applied to a [`SessionRecord`] by
/// [`SessionRegistry::update`]. Every `Some` field overwrites the current
/// value (last-writer-wins); `None` leaves it untouched. `custom_tools`
/// entries are merged into the existing map rather than replacing it.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub initialized: Option<bool>,
    pub protocol_version: Option<String>,
    pub client_info: Option<PeerInfo>,
    pub server_info: Option<PeerInfo>,
    pub negotiated_capabilities: Option<Value>,
    pub custom_tools: Option<HashMap<String, ToolDescriptor>>,
}

impl SessionPatch {
    pub fn apply_to(self, record: &mut SessionRecord) {
        if let Some(initialized) = self.initialized {
            record.initialized = initialized;
        }
        if let Some(version) = self.protocol_version {
            record.protocol_version = Some(version);
        }
        if let Some(client_info) = self.client_info {
            record.client_info = Some(client_info);
        }
        if let Some(server_info) = self.server_info {
            record.server_info = Some(server_info);
        }
        if let Some(caps) = self.negotiated_capabilities {
            record.negotiated_capabilities = Some(caps);
        }
        if let Some(tools) = self.custom_tools {
            record.custom_tools.extend(tools);
        }
        record.touch();
    }
}

/// Errors a registry operation can return. These are registry-internal;
/// the dispatcher (`mcp-server`) maps them onto the JSON-RPC error
/// taxonomy, it does not propagate them verbatim.
#[derive(Debug, Error)]
pub enum SessionRegistryError {
    #[error("session already registered: {0}")]
    AlreadyRegistered(String),
    #[error("session not found: {0}")]
    NotFound(String),
}

/// Process-wide mapping from `session_id` to [`SessionRecord`], with
/// liveness monitoring of the owner reference. All operations are
/// serialized and linearizable relative to one another (`spec.md` §4.1).
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Insert a new session record, beginning to monitor its owner (if
    /// any) for disconnection.
    async fn register(
        &self,
        session_id: String,
        record: SessionRecord,
    ) -> Result<(), SessionRegistryError>;

    /// Remove a session. Idempotent — removing an absent session is not an
    /// error.
    async fn unregister(&self, session_id: &str);

    /// Fetch a copy of the current record.
    async fn lookup(&self, session_id: &str) -> Result<SessionRecord, SessionRegistryError>;

    /// Atomically merge `patch` into the stored record.
    async fn update(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<(), SessionRegistryError>;

    /// Snapshot of every live session.
    async fn list(&self) -> HashMap<String, SessionRecord>;

    /// Number of live sessions, for logging/diagnostics.
    async fn session_count(&self) -> usize;
}

/// Type-erased registry handle, the shape transport adapters and the
/// dispatcher actually hold (`Arc<dyn SessionRegistry>`).
pub type SharedSessionRegistry = Arc<dyn SessionRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_overwrites_only_set_fields() {
        let mut record = SessionRecord::new(Transport::Sse, None);
        record.protocol_version = Some("2024-11-05".to_string());

        let patch = SessionPatch {
            initialized: Some(true),
            ..Default::default()
        };
        let before_version = record.protocol_version.clone();
        patch.apply_to(&mut record);

        assert!(record.initialized);
        assert_eq!(record.protocol_version, before_version);
    }

    #[test]
    fn patch_merges_custom_tools_without_clobbering() {
        let mut record = SessionRecord::new(Transport::Stdio, None);
        let mut first = HashMap::new();
        first.insert(
            "alpha".to_string(),
            ToolDescriptor {
                name: "alpha".to_string(),
                description: None,
                input_schema: Value::Null,
            },
        );
        SessionPatch {
            custom_tools: Some(first),
            ..Default::default()
        }
        .apply_to(&mut record);

        let mut second = HashMap::new();
        second.insert(
            "beta".to_string(),
            ToolDescriptor {
                name: "beta".to_string(),
                description: None,
                input_schema: Value::Null,
            },
        );
        SessionPatch {
            custom_tools: Some(second),
            ..Default::default()
        }
        .apply_to(&mut record);

        assert_eq!(record.custom_tools.len(), 2);
        assert!(record.custom_tools.contains_key("alpha"));
        assert!(record.custom_tools.contains_key("beta"));
    }
}
