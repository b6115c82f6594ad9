//! Method-name routing (§6.1, §6.3, §9).
//!
//! Deliberately NOT reflection-based: every method name is matched
//! explicitly against the fixed set §6.3 defines, the same shape as the
//! real protocol's `Side` trait dispatch (`rpc.rs` in the pack) and the
//! teacher's own `handle_method` match in `mcp/mod.rs`. An unrecognized
//! request becomes `METHOD_NOT_FOUND`; an unrecognized notification is
//! dropped silently (§6.1) — except both fall through to the handler's
//! `ext_method`/`ext_notification` first when the method name starts
//! with `_` (§B.3).
//!
//! The four session-lifecycle methods (`session/new`, `session/load`,
//! `session/prompt`, `session/cancel`) are NOT routed here: they need the
//! connection's [`crate::session::SessionRegistry`] to mint ids and
//! enforce the busy/unknown-session invariants (§4.6), so `Connection`
//! intercepts them before falling back to this module for everything
//! else an `Agent` handles.

use serde_json::Value;

use crate::error::{Error, ProtocolError};
use crate::handler::{Agent, Client};
use crate::types::agent::AGENT_METHOD_NAMES;
use crate::types::client::CLIENT_METHOD_NAMES;

pub(crate) fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> Result<T, ProtocolError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| ProtocolError::invalid_params(e.to_string()))
}

pub(crate) fn to_value<T: serde::Serialize>(value: T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(Error::Serialization)
}

pub(crate) fn peer_err(e: ProtocolError) -> Error {
    Error::Peer(e)
}

/// Routes an inbound request to an [`Agent`] implementation, returning
/// the wire `result` value on success. Handles only the session-free
/// methods; `Connection` intercepts `session/new`, `session/load`, and
/// `session/prompt` before a call ever reaches here.
pub async fn dispatch_agent_request(
    agent: &dyn Agent,
    method: &str,
    params: Option<Value>,
) -> Result<Value, Error> {
    let names = AGENT_METHOD_NAMES;
    match method {
        m if m == names.initialize => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(agent.initialize(req).await?)
        }
        m if m == names.authenticate => {
            let req = parse_params(params).map_err(peer_err)?;
            agent.authenticate(req).await?;
            Ok(Value::Object(Default::default()))
        }
        m if m.starts_with('_') => agent.ext_method(m, params).await,
        other => Err(peer_err(ProtocolError::method_not_found(other))),
    }
}

/// Routes an inbound notification to an [`Agent`] implementation. Per
/// §6.1, anything that isn't a recognized method (and isn't an `_`
/// extension method) is silently dropped rather than erroring — there's
/// no response channel for a notification to report through.
///
/// `session/cancel` is intercepted by `Connection` before reaching here,
/// since flipping the cancellation flag requires the session registry.
pub async fn dispatch_agent_notification(agent: &dyn Agent, method: &str, params: Option<Value>) {
    match method {
        m if m.starts_with('_') => agent.ext_notification(m, params).await,
        _ => {}
    }
}

/// Routes an inbound request to a [`Client`] implementation.
pub async fn dispatch_client_request(
    client: &dyn Client,
    method: &str,
    params: Option<Value>,
) -> Result<Value, Error> {
    let names = CLIENT_METHOD_NAMES;
    match method {
        m if m == names.session_request_permission => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.request_permission(req).await?)
        }
        m if m == names.fs_write_text_file => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.write_text_file(req).await?)
        }
        m if m == names.fs_read_text_file => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.read_text_file(req).await?)
        }
        m if m == names.terminal_create => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.create_terminal(req).await?)
        }
        m if m == names.terminal_output => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.terminal_output(req).await?)
        }
        m if m == names.terminal_wait_for_exit => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.wait_for_terminal_exit(req).await?)
        }
        m if m == names.terminal_kill => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.kill_terminal(req).await?)
        }
        m if m == names.terminal_release => {
            let req = parse_params(params).map_err(peer_err)?;
            to_value(client.release_terminal(req).await?)
        }
        m if m.starts_with('_') => client.ext_method(m, params).await,
        other => Err(peer_err(ProtocolError::method_not_found(other))),
    }
}

/// Routes an inbound notification to a [`Client`] implementation.
pub async fn dispatch_client_notification(client: &dyn Client, method: &str, params: Option<Value>) {
    let names = CLIENT_METHOD_NAMES;
    match method {
        m if m == names.session_update => {
            if let Ok(req) = parse_params(params) {
                client.session_update(req).await;
            }
        }
        m if m.starts_with('_') => client.ext_notification(m, params).await,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgentCapabilities, AuthenticateRequest, CancelNotification, InitializeRequest,
        InitializeResponse, LoadSessionRequest, LoadSessionResponse, NewSessionRequest,
        NewSessionResponse, PromptRequest, PromptResponse, SessionId, StopReason,
    };
    use crate::types::client::{
        CreateTerminalRequest, ReadTextFileRequest, ReadTextFileResponse,
        RequestPermissionRequest, RequestPermissionResponse, SessionNotification,
        WriteTextFileRequest, WriteTextFileResponse,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubAgent {
        cancelled: AtomicBool,
    }

    #[async_trait]
    impl Agent for StubAgent {
        async fn initialize(&self, _args: InitializeRequest) -> Result<InitializeResponse, Error> {
            Ok(InitializeResponse {
                protocol_version: crate::types::ProtocolVersion(1),
                agent_capabilities: AgentCapabilities::default(),
                auth_methods: vec![],
                meta: None,
            })
        }
        async fn authenticate(&self, _args: AuthenticateRequest) -> Result<(), Error> {
            Ok(())
        }
        async fn new_session(&self, _args: NewSessionRequest) -> Result<NewSessionResponse, Error> {
            Ok(NewSessionResponse {
                session_id: SessionId("s".into()),
                meta: None,
            })
        }
        async fn load_session(
            &self,
            _args: LoadSessionRequest,
        ) -> Result<LoadSessionResponse, Error> {
            Ok(LoadSessionResponse { meta: None })
        }
        async fn prompt(
            &self,
            _args: PromptRequest,
            _cancellation: crate::session::CancellationToken,
        ) -> Result<PromptResponse, Error> {
            Ok(PromptResponse {
                stop_reason: StopReason::EndTurn,
                meta: None,
            })
        }
        async fn cancel(&self, _args: CancelNotification) -> Result<(), Error> {
            self.cancelled.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn unknown_request_method_is_method_not_found() {
        let agent = StubAgent {
            cancelled: AtomicBool::new(false),
        };
        let err = dispatch_agent_request(&agent, "bogus/method", None)
            .await
            .unwrap_err();
        match err {
            Error::Peer(e) => assert_eq!(e.code, crate::error::METHOD_NOT_FOUND),
            other => panic!("expected Peer error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_notification_is_silently_dropped() {
        let agent = StubAgent {
            cancelled: AtomicBool::new(false),
        };
        dispatch_agent_notification(&agent, "bogus/notify", None).await;
        assert!(!agent.cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn initialize_routes_and_serializes_response() {
        let agent = StubAgent {
            cancelled: AtomicBool::new(false),
        };
        let result = dispatch_agent_request(
            &agent,
            "initialize",
            Some(json!({"protocolVersion": 1})),
        )
        .await
        .unwrap();
        assert_eq!(result["protocolVersion"], json!(1));
    }

    struct StubClient;

    #[async_trait]
    impl Client for StubClient {
        async fn session_update(&self, _args: SessionNotification) {}

        async fn request_permission(
            &self,
            _args: RequestPermissionRequest,
        ) -> Result<RequestPermissionResponse, Error> {
            Ok(RequestPermissionResponse {
                outcome: crate::types::client::RequestPermissionOutcome::Cancelled,
                meta: None,
            })
        }

        async fn write_text_file(
            &self,
            _args: WriteTextFileRequest,
        ) -> Result<WriteTextFileResponse, Error> {
            Ok(WriteTextFileResponse { meta: None })
        }

        async fn read_text_file(
            &self,
            _args: ReadTextFileRequest,
        ) -> Result<ReadTextFileResponse, Error> {
            Ok(ReadTextFileResponse {
                content: String::new(),
                meta: None,
            })
        }
    }

    #[tokio::test]
    async fn unimplemented_terminal_method_falls_back_to_default() {
        let client = StubClient;
        let err = client
            .create_terminal(CreateTerminalRequest {
                session_id: SessionId("s".into()),
                command: "ls".into(),
                args: vec![],
                env: vec![],
                cwd: None,
                meta: None,
            })
            .await
            .unwrap_err();
        match err {
            Error::Peer(e) => assert_eq!(e.code, crate::error::METHOD_NOT_FOUND),
            other => panic!("expected Peer error, got {other:?}"),
        }
    }
}
