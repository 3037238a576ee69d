//! The registry's only implementation: an `Arc<RwLock<HashMap<...>>>` guarded
//! map, matching the shape of the teacher's `InMemorySessionStorage`. This is
//! the single serialization point for session-state mutation described in
//! `spec.md` §4.1/§5 — we pick a mutex-guarded map over a dedicated actor
//! task because the teacher's own in-memory backend makes the same choice.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::traits::{SessionPatch, SessionRecord, SessionRegistry, SessionRegistryError};

/// In-memory, non-persistent session registry. One instance is shared
/// (behind an `Arc`) across every transport adapter and the dispatcher.
#[derive(Clone, Default)]
pub struct InMemorySessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the task that waits for the owner to disconnect, then removes
    /// the session. This is the ONLY automatic removal path (`spec.md`
    /// §4.1) — ordinary dispatch never removes sessions itself.
    fn monitor_owner(&self, session_id: String, owner: Arc<dyn crate::traits::OwnerHandle>) {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            owner.closed().await;
            if sessions.write().await.remove(&session_id).is_some() {
                info!(session_id, "owner disconnected, session removed");
            }
        });
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(
        &self,
        session_id: String,
        record: SessionRecord,
    ) -> Result<(), SessionRegistryError> {
        let owner = record.owner.clone();
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                return Err(SessionRegistryError::AlreadyRegistered(session_id));
            }
            sessions.insert(session_id.clone(), record);
        }
        debug!(session_id = %session_id, "session registered");
        if let Some(owner) = owner {
            self.monitor_owner(session_id, owner);
        }
        Ok(())
    }

    async fn unregister(&self, session_id: &str) {
        if self.sessions.write().await.remove(session_id).is_some() {
            debug!(session_id, "session unregistered");
        }
    }

    async fn lookup(&self, session_id: &str) -> Result<SessionRecord, SessionRegistryError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionRegistryError::NotFound(session_id.to_string()))
    }

    async fn update(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<(), SessionRegistryError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(record) => {
                patch.apply_to(record);
                Ok(())
            }
            None => {
                warn!(session_id, "update on unknown session");
                Err(SessionRegistryError::NotFound(session_id.to_string()))
            }
        }
    }

    async fn list(&self) -> HashMap<String, SessionRecord> {
        self.sessions.read().await.clone()
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
