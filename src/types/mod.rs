//! Wire record families (§3, §4.3, §6.3): one module per family, mirroring
//! the real protocol's own split between core scalars, content blocks,
//! session-update variants, agent-handled records, and client-handled
//! records.

pub mod agent;
pub mod client;
pub mod content;
pub mod core;
pub mod session_update;

pub use agent::*;
pub use client::*;
pub use content::ContentBlock;
pub use core::{EnvVariable, McpServer, Meta, ProtocolVersion, SessionId};
pub use session_update::SessionUpdate;
