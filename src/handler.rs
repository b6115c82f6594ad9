//! The `Agent` and `Client` handler traits (§6.4): the contract the
//! connection engine drives and the contract an embedder implements.
//!
//! Grounded on the teacher's `ServerHandler` trait
//! (`mcp/mod.rs::McpOdooHandler`), an `#[async_trait]` interface with one
//! method per inbound operation plus a catch-all for anything the fixed
//! methods don't cover; here the catch-all becomes `ext_method` /
//! `ext_notification` for `_`-prefixed extension methods (§B.3).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::session::CancellationToken;
use crate::types::{
    AuthenticateRequest, CancelNotification, InitializeRequest, InitializeResponse,
    LoadSessionRequest, LoadSessionResponse, NewSessionRequest, NewSessionResponse, PromptRequest,
    PromptResponse,
};
use crate::types::client::{
    CreateTerminalRequest, CreateTerminalResponse, KillTerminalRequest, KillTerminalResponse,
    ReadTextFileRequest, ReadTextFileResponse, ReleaseTerminalRequest, ReleaseTerminalResponse,
    RequestPermissionRequest, RequestPermissionResponse, SessionNotification,
    TerminalOutputRequest, TerminalOutputResponse, WaitForTerminalExitRequest,
    WaitForTerminalExitResponse, WriteTextFileRequest, WriteTextFileResponse,
};

/// Implemented by an embedder playing the agent role: it answers
/// `initialize`, manages sessions, and runs prompt turns (§6.3, §6.4).
#[async_trait]
pub trait Agent: Send + Sync {
    async fn initialize(&self, args: InitializeRequest) -> Result<InitializeResponse, Error>;

    async fn authenticate(&self, args: AuthenticateRequest) -> Result<(), Error>;

    async fn new_session(&self, args: NewSessionRequest) -> Result<NewSessionResponse, Error>;

    async fn load_session(&self, args: LoadSessionRequest) -> Result<LoadSessionResponse, Error>;

    /// Runs one prompt turn. `cancellation` is the engine's handle onto
    /// this session's cancel flag (§5): a turn that's been cancelled must
    /// still return promptly with `stop_reason = "cancelled"` rather than
    /// erroring.
    async fn prompt(
        &self,
        args: PromptRequest,
        cancellation: CancellationToken,
    ) -> Result<PromptResponse, Error>;

    /// Notification-side hook for `session/cancel`, for handler-specific
    /// bookkeeping. The engine itself flips the session's cancellation
    /// flag before calling this (§4.6) — the flag is what a running
    /// `prompt` observes, regardless of what this method does.
    async fn cancel(&self, args: CancelNotification) -> Result<(), Error>;

    /// Handles an extension method (a `_`-prefixed method name, §B.3) the
    /// fixed operations above don't cover. The default rejects with
    /// `METHOD_NOT_FOUND`.
    async fn ext_method(&self, method: &str, _params: Option<Value>) -> Result<Value, Error> {
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            method,
        )))
    }

    /// Handles an extension notification. The default silently drops it,
    /// matching the fixed-notification drop rule in §6.1.
    async fn ext_notification(&self, _method: &str, _params: Option<Value>) {}
}

/// Implemented by an embedder playing the client role: it renders
/// session updates, grants permissions, and services file/terminal
/// requests on the agent's behalf (§6.3, §6.4).
#[async_trait]
pub trait Client: Send + Sync {
    async fn session_update(&self, args: SessionNotification);

    async fn request_permission(
        &self,
        args: RequestPermissionRequest,
    ) -> Result<RequestPermissionResponse, Error>;

    async fn write_text_file(
        &self,
        args: WriteTextFileRequest,
    ) -> Result<WriteTextFileResponse, Error>;

    async fn read_text_file(
        &self,
        args: ReadTextFileRequest,
    ) -> Result<ReadTextFileResponse, Error>;

    async fn create_terminal(
        &self,
        args: CreateTerminalRequest,
    ) -> Result<CreateTerminalResponse, Error> {
        let _ = args;
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            "terminal/create",
        )))
    }

    async fn terminal_output(
        &self,
        args: TerminalOutputRequest,
    ) -> Result<TerminalOutputResponse, Error> {
        let _ = args;
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            "terminal/output",
        )))
    }

    async fn wait_for_terminal_exit(
        &self,
        args: WaitForTerminalExitRequest,
    ) -> Result<WaitForTerminalExitResponse, Error> {
        let _ = args;
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            "terminal/wait_for_exit",
        )))
    }

    async fn kill_terminal(
        &self,
        args: KillTerminalRequest,
    ) -> Result<KillTerminalResponse, Error> {
        let _ = args;
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            "terminal/kill",
        )))
    }

    async fn release_terminal(
        &self,
        args: ReleaseTerminalRequest,
    ) -> Result<ReleaseTerminalResponse, Error> {
        let _ = args;
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            "terminal/release",
        )))
    }

    /// Handles an extension method (§B.3). The default rejects with
    /// `METHOD_NOT_FOUND`.
    async fn ext_method(&self, method: &str, _params: Option<Value>) -> Result<Value, Error> {
        Err(Error::Peer(crate::error::ProtocolError::method_not_found(
            method,
        )))
    }

    /// Handles an extension notification. The default silently drops it.
    async fn ext_notification(&self, _method: &str, _params: Option<Value>) {}
}
