//! Error types shared across the connection engine.

use serde::{Deserialize, Serialize};

/// Reserved JSON-RPC 2.0 error codes (<https://www.jsonrpc.org/specification#error_object>).
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Protocol-specific codes this crate defines on top of the JSON-RPC reserved range.
pub const SESSION_NOT_FOUND: i64 = -32602;
pub const SESSION_BUSY: i64 = -32002;

/// The `{code, message, data}` triple carried by an error response (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProtocolError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message.into())
    }

    pub fn unknown_session(id: impl std::fmt::Display) -> Self {
        Self::new(SESSION_NOT_FOUND, format!("Unknown session: {id}"))
    }

    pub fn session_busy(id: impl std::fmt::Display) -> Self {
        Self::new(SESSION_BUSY, format!("Session busy: {id}"))
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ProtocolError {}

/// Errors surfaced to callers of `send_request`/`send_notification` and the
/// `start_client`/`start_agent` façade. Framing-level failures (`FrameError`)
/// never reach this type directly — the connection logs and discards them
/// per §7 instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("peer returned an error: {0}")]
    Peer(#[from] ProtocolError),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent executable not found: {0}")]
    AgentNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
