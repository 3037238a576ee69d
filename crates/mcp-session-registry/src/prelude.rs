//! Convenient re-exports of the most commonly used types from this crate.
//!
//! ```rust
//! use mcp_session_registry::prelude::*;
//! ```

pub use crate::in_memory::InMemorySessionRegistry;
pub use crate::traits::{
    OwnerHandle, PeerInfo, SessionPatch, SessionRecord, SessionRegistry, SessionRegistryError,
    SharedSessionRegistry, ToolDescriptor, Transport,
};
pub use crate::create_default_registry;
