//! # Session Registry
//!
//! The process-wide map from `session_id` to session record (`spec.md`
//! §3/§4.1): register, unregister, lookup, update, list, plus liveness
//! monitoring of whatever owns a session's outbound delivery channel.
//!
//! Only an in-memory backend is provided — sessions here are inherently
//! tied to a live transport connection, so there is nothing meaningful to
//! persist across a restart.

pub mod in_memory;
pub mod prelude;
mod traits;

pub use in_memory::InMemorySessionRegistry;
pub use traits::{
    OwnerHandle, PeerInfo, SessionPatch, SessionRecord, SessionRegistry, SessionRegistryError,
    SharedSessionRegistry, ToolDescriptor, Transport,
};

/// Build the default (in-memory) registry behind the shared handle type
/// every transport adapter and the dispatcher depend on.
pub fn create_default_registry() -> SharedSessionRegistry {
    std::sync::Arc::new(InMemorySessionRegistry::new())
}
