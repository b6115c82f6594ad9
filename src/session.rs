//! Session registry: per-session state machine and id generation (§5,
//! §6.3).
//!
//! Grounded on the teacher's `mcp/registry.rs`, which keeps its
//! authoritative state behind an `Arc<RwLock<RegistryState>>` guarded by
//! a single struct that owns all mutation; the same shape here tracks
//! session lifecycle instead of tool/prompt config.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use tokio::sync::RwLock;

use crate::error::{Error, ProtocolError};
use crate::types::SessionId;

/// A session's position in the prompt-turn state machine (§5). A session
/// starts `Idle`, moves to `Prompting` for the duration of one
/// `session/prompt` call, and returns to `Idle` once that call resolves
/// — whether by completing, erroring, or being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Prompting,
}

struct SessionRecord {
    state: SessionState,
    cancelled: bool,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, SessionRecord>,
}

/// Tracks every session this connection knows about and enforces the
/// at-most-one-in-flight-prompt-per-session invariant (§5, edge case:
/// a second concurrent `session/prompt` on a busy session is rejected
/// with `SESSION_BUSY` rather than queued).
#[derive(Clone)]
pub struct SessionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
        }
    }

    /// Mints a fresh, URL-safe session id with at least 128 bits of
    /// entropy (§4.3) and registers it as `Idle`.
    pub async fn create(&self) -> SessionId {
        let id = generate_session_id();
        let mut state = self.state.write().await;
        state.sessions.insert(
            id.clone(),
            SessionRecord {
                state: SessionState::Idle,
                cancelled: false,
            },
        );
        id
    }

    /// Registers a session id handed back by `session/load`, without
    /// minting a new one.
    pub async fn register_loaded(&self, id: SessionId) {
        let mut state = self.state.write().await;
        state.sessions.insert(
            id,
            SessionRecord {
                state: SessionState::Idle,
                cancelled: false,
            },
        );
    }

    pub async fn exists(&self, id: &SessionId) -> bool {
        self.state.read().await.sessions.contains_key(id)
    }

    /// Transitions `id` from `Idle` to `Prompting`, or fails with
    /// `SESSION_NOT_FOUND` / `SESSION_BUSY` per §5's invariants.
    pub async fn begin_prompt(&self, id: &SessionId) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let record = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::Peer(ProtocolError::unknown_session(id.to_string())))?;
        if record.state == SessionState::Prompting {
            return Err(Error::Peer(ProtocolError::session_busy(id.to_string())));
        }
        record.state = SessionState::Prompting;
        record.cancelled = false;
        Ok(())
    }

    /// Returns a session to `Idle` once its prompt turn has resolved.
    pub async fn end_prompt(&self, id: &SessionId) {
        let mut state = self.state.write().await;
        if let Some(record) = state.sessions.get_mut(id) {
            record.state = SessionState::Idle;
        }
    }

    /// Marks `id` cancelled; a no-op (but not an error) if the session
    /// is unknown or already idle, matching `session/cancel`'s
    /// fire-and-forget notification semantics (§6.3).
    pub async fn cancel(&self, id: &SessionId) {
        let mut state = self.state.write().await;
        if let Some(record) = state.sessions.get_mut(id) {
            record.cancelled = true;
        }
    }

    pub async fn is_cancelled(&self, id: &SessionId) -> bool {
        self.state
            .read()
            .await
            .sessions
            .get(id)
            .map(|r| r.cancelled)
            .unwrap_or(false)
    }

    pub async fn state_of(&self, id: &SessionId) -> Option<SessionState> {
        self.state.read().await.sessions.get(id).map(|r| r.state)
    }

    /// Hands out a [`CancellationToken`] a running `session/prompt` handler
    /// can poll to see whether `session/cancel` has since arrived (§5).
    pub fn token(&self, id: &SessionId) -> CancellationToken {
        CancellationToken {
            id: id.clone(),
            registry: self.clone(),
        }
    }
}

/// A handle the engine hands a running `session/prompt` call so it can
/// observe cancellation without reaching into the registry directly.
#[derive(Clone)]
pub struct CancellationToken {
    id: SessionId,
    registry: SessionRegistry,
}

impl CancellationToken {
    pub async fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(&self.id).await
    }
}

/// Generates a URL-safe-base64-encoded 128-bit random session id (§4.3),
/// using a v4 UUID as the entropy source.
fn generate_session_id() -> SessionId {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    SessionId(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}
