//! The connection controller: the read loop that classifies inbound
//! frames, dispatches them to the local handler, and serializes outbound
//! writes (§6.1, §6.2, §7).
//!
//! Grounded on the teacher's `ServerCompat::start` (`mcp/runtime.rs`): a
//! `while let Some(message) = stream.next()` loop that classifies each
//! message and replies on the same transport. Two differences the spec
//! requires: (1) this engine is bidirectional — either side can also
//! *originate* requests, so the controller keeps a [`PendingRequests`]
//! table the teacher's one-way server loop has no need for; (2) each
//! inbound request is handled on its own spawned task so one session's
//! slow `session/prompt` can't block another session's traffic (§5) —
//! the teacher's loop, serving one unauthenticated caller at a time,
//! never needed that.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::dispatch::{
    dispatch_agent_notification, dispatch_agent_request, dispatch_client_notification,
    dispatch_client_request, parse_params, peer_err, to_value,
};
use crate::error::{Error, ProtocolError};
use crate::handler::{Agent, Client};
use crate::message::{
    build_error_response, build_notification, build_request, build_response, classify, Message,
    RequestId,
};
use crate::pending::PendingRequests;
use crate::session::SessionRegistry;
use crate::transport::{FrameReader, FrameWriter};
use crate::types::agent::AGENT_METHOD_NAMES;
use crate::types::{CancelNotification, LoadSessionRequest, NewSessionRequest, PromptRequest};

/// Which side of the protocol this connection's local handler plays
/// (§2, §6.3): an agent-role connection answers `Agent` methods and
/// calls out to the peer's `Client` methods, and vice versa.
pub enum Role {
    Agent(Arc<dyn Agent>),
    Client(Arc<dyn Client>),
}

/// A live, bidirectional JSON-RPC connection over a framed byte stream.
/// Owns the outbound write lock, the pending-request table, and the
/// session registry; `run` drives the read loop until the peer closes
/// the stream.
pub struct Connection<W> {
    writer: Arc<FrameWriter<W>>,
    pending: PendingRequests,
    sessions: SessionRegistry,
    next_id: AtomicI64,
}

impl<W: AsyncWrite + Unpin + Send + 'static> Connection<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(FrameWriter::new(writer)),
            pending: PendingRequests::new(),
            sessions: SessionRegistry::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Sends a request to the peer and awaits its reply, deserializing
    /// `result` as `R`. A peer error response surfaces as
    /// `Error::Peer`.
    pub async fn send_request<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, Error> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let params_value = serde_json::to_value(params)?;
        let frame = build_request(&id, method, Some(params_value));
        let waiter = self.pending.wait(id.clone()).await;
        self.writer.write_frame(&frame).await?;
        let reply = waiter.await?;
        let result = reply?;
        Ok(serde_json::from_value(result)?)
    }

    /// Sends a one-way notification to the peer.
    pub async fn send_notification<P: Serialize>(&self, method: &str, params: P) -> Result<(), Error> {
        let params_value = serde_json::to_value(params)?;
        let frame = build_notification(method, Some(params_value));
        self.writer.write_frame(&frame).await?;
        Ok(())
    }

    /// Drives the read loop until the peer closes the stream or the
    /// transport hits a genuine I/O error. A malformed frame never gets
    /// this far: per §7, `FrameReader::next_frame` already logs and
    /// discards it, resyncing onto the next frame boundary on its own —
    /// the `Err` arm below only fires for stream-level failures (e.g. the
    /// peer closing mid-frame), which do tear the connection down.
    pub async fn run<R: AsyncRead + Unpin>(self: Arc<Self>, reader: R, role: Role) -> Result<(), Error> {
        let role = Arc::new(role);
        let mut frames = FrameReader::new(reader);
        loop {
            let value = match frames.next_frame().await {
                Ok(Some(v)) => v,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "frame stream error; closing connection");
                    self.pending.fail_all().await;
                    return Err(e);
                }
            };

            let message = match classify(value) {
                Ok(m) => m,
                Err(e) => {
                    debug!(error = %e, "dropping unclassifiable message");
                    continue;
                }
            };

            match message {
                Message::Request { id, method, params } => {
                    let this = Arc::clone(&self);
                    let role = Arc::clone(&role);
                    tokio::spawn(async move {
                        this.handle_request(id, method, params, &role).await;
                    });
                }
                Message::Notification { method, params } => {
                    let this = Arc::clone(&self);
                    let role = Arc::clone(&role);
                    tokio::spawn(async move {
                        this.handle_notification(method, params, &role).await;
                    });
                }
                Message::Response { id, result } => {
                    self.pending.resolve(&id, Ok(result)).await;
                }
                Message::ErrorResponse { id, error } => {
                    self.pending.resolve(&id, Err(error)).await;
                }
            }
        }
        self.pending.fail_all().await;
        Ok(())
    }

    async fn handle_request(
        &self,
        id: RequestId,
        method: String,
        params: Option<Value>,
        role: &Role,
    ) {
        let result = match role {
            Role::Agent(agent) => self.dispatch_agent_request_with_sessions(agent.as_ref(), &method, params).await,
            Role::Client(client) => dispatch_client_request(client.as_ref(), &method, params).await,
        };

        let frame = match result {
            Ok(value) => build_response(&id, value),
            Err(Error::Peer(e)) => build_error_response(&id, &e),
            Err(e) => build_error_response(&id, &ProtocolError::internal_error(e.to_string())),
        };

        if let Err(e) = self.writer.write_frame(&frame).await {
            warn!(error = %e, method = %method, "failed to write response");
        }
    }

    async fn handle_notification(&self, method: String, params: Option<Value>, role: &Role) {
        match role {
            Role::Agent(agent) => {
                if method == AGENT_METHOD_NAMES.session_cancel {
                    self.handle_session_cancel(agent.as_ref(), params).await;
                } else {
                    dispatch_agent_notification(agent.as_ref(), &method, params).await;
                }
            }
            Role::Client(client) => {
                dispatch_client_notification(client.as_ref(), &method, params).await
            }
        }
    }

    /// Routes the three session-lifecycle requests through this
    /// connection's own [`SessionRegistry`] (§4.6) before falling back to
    /// [`dispatch_agent_request`] for everything else an `Agent` handles.
    /// This is what gives every `Agent` implementation engine-minted
    /// session ids and busy/unknown-session enforcement for free, instead
    /// of leaving it to each implementation to reimplement correctly.
    async fn dispatch_agent_request_with_sessions(
        &self,
        agent: &dyn Agent,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, Error> {
        let names = AGENT_METHOD_NAMES;
        match method {
            m if m == names.session_new => self.handle_session_new(agent, params).await,
            m if m == names.session_load => self.handle_session_load(agent, params).await,
            m if m == names.session_prompt => self.handle_session_prompt(agent, params).await,
            other => dispatch_agent_request(agent, other, params).await,
        }
    }

    /// `session/new`: the registry mints the session id (§4.3's ≥128-bit
    /// entropy requirement), the handler does whatever setup it needs,
    /// and the reply carries the registry's id regardless of what the
    /// handler put in its own response — callers never get to mint their
    /// own session ids.
    async fn handle_session_new(&self, agent: &dyn Agent, params: Option<Value>) -> Result<Value, Error> {
        let req: NewSessionRequest = parse_params(params).map_err(peer_err)?;
        let id = self.sessions.create().await;
        let mut response = agent.new_session(req).await?;
        response.session_id = id;
        to_value(response)
    }

    /// `session/load`: registers the handed-back session id as `Idle`
    /// before calling the handler, so a `session/prompt` that races the
    /// response still finds a known session.
    async fn handle_session_load(&self, agent: &dyn Agent, params: Option<Value>) -> Result<Value, Error> {
        let req: LoadSessionRequest = parse_params(params).map_err(peer_err)?;
        self.sessions.register_loaded(req.session_id.clone()).await;
        let response = agent.load_session(req).await?;
        to_value(response)
    }

    /// `session/prompt`: enforces unknown-session (`-32602`) and
    /// at-most-one-in-flight-prompt (`-32002`, §4.6) before calling the
    /// handler, and always returns the session to `Idle` afterward —
    /// whether the handler's turn completed, errored, or was cancelled.
    async fn handle_session_prompt(&self, agent: &dyn Agent, params: Option<Value>) -> Result<Value, Error> {
        let req: PromptRequest = parse_params(params).map_err(peer_err)?;
        self.sessions.begin_prompt(&req.session_id).await?;
        let session_id = req.session_id.clone();
        let cancellation = self.sessions.token(&session_id);
        let result = agent.prompt(req, cancellation).await;
        self.sessions.end_prompt(&session_id).await;
        to_value(result?)
    }

    /// `session/cancel`: flips the registry's cancellation flag — what a
    /// running `prompt` observes through its `CancellationToken` — then
    /// gives the handler a chance to react via `Agent::cancel`.
    async fn handle_session_cancel(&self, agent: &dyn Agent, params: Option<Value>) {
        let req: CancelNotification = match parse_params(params) {
            Ok(req) => req,
            Err(_) => return,
        };
        self.sessions.cancel(&req.session_id).await;
        let _ = agent.cancel(req).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgentCapabilities, AuthenticateRequest, CancelNotification, InitializeRequest,
        InitializeResponse, LoadSessionRequest, LoadSessionResponse, NewSessionRequest,
        NewSessionResponse, ProtocolVersion, PromptRequest, PromptResponse, SessionId, StopReason,
    };
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        async fn initialize(&self, args: InitializeRequest) -> Result<InitializeResponse, Error> {
            Ok(InitializeResponse {
                protocol_version: args.protocol_version,
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
                session_id: SessionId("s1".into()),
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
            Ok(())
        }
    }

    #[tokio::test]
    async fn initialize_round_trip_over_duplex_stream() {
        let (client_io, agent_io) = tokio::io::duplex(8192);
        let (agent_reader, agent_writer) = tokio::io::split(agent_io);
        let (client_reader, client_writer) = tokio::io::split(client_io);

        let agent_conn = Arc::new(Connection::new(agent_writer));
        let agent_conn_run = Arc::clone(&agent_conn);
        tokio::spawn(async move {
            let _ = agent_conn_run
                .run(agent_reader, Role::Agent(Arc::new(EchoAgent)))
                .await;
        });

        let client_conn = Arc::new(Connection::new(client_writer));
        let client_conn_run = Arc::clone(&client_conn);
        tokio::spawn(async move {
            struct NullClient;
            #[async_trait]
            impl Client for NullClient {
                async fn session_update(&self, _args: crate::types::client::SessionNotification) {}
                async fn request_permission(
                    &self,
                    _args: crate::types::client::RequestPermissionRequest,
                ) -> Result<crate::types::client::RequestPermissionResponse, Error> {
                    unreachable!()
                }
                async fn write_text_file(
                    &self,
                    _args: crate::types::client::WriteTextFileRequest,
                ) -> Result<crate::types::client::WriteTextFileResponse, Error> {
                    unreachable!()
                }
                async fn read_text_file(
                    &self,
                    _args: crate::types::client::ReadTextFileRequest,
                ) -> Result<crate::types::client::ReadTextFileResponse, Error> {
                    unreachable!()
                }
            }
            let _ = client_conn_run.run(client_reader, Role::Client(Arc::new(NullClient))).await;
        });

        let response: InitializeResponse = client_conn
            .send_request(
                "initialize",
                json!({"protocolVersion": 1}),
            )
            .await
            .unwrap();
        assert_eq!(response.protocol_version, ProtocolVersion(1));
    }

    #[tokio::test]
    async fn session_new_uses_engine_minted_id_not_the_agents() {
        struct NaiveAgent;
        #[async_trait]
        impl Agent for NaiveAgent {
            async fn initialize(&self, args: InitializeRequest) -> Result<InitializeResponse, Error> {
                Ok(InitializeResponse {
                    protocol_version: args.protocol_version,
                    agent_capabilities: AgentCapabilities::default(),
                    auth_methods: vec![],
                    meta: None,
                })
            }
            async fn authenticate(&self, _args: AuthenticateRequest) -> Result<(), Error> {
                Ok(())
            }
            async fn new_session(&self, _args: NewSessionRequest) -> Result<NewSessionResponse, Error> {
                // Deliberately returns a bogus id, as a spec-naive agent might.
                Ok(NewSessionResponse {
                    session_id: SessionId("whatever-i-like".into()),
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
                Ok(())
            }
        }

        let (client_io, agent_io) = tokio::io::duplex(8192);
        let (agent_reader, agent_writer) = tokio::io::split(agent_io);
        let (client_reader, client_writer) = tokio::io::split(client_io);

        let agent_conn = Arc::new(Connection::new(agent_writer));
        let agent_conn_run = Arc::clone(&agent_conn);
        tokio::spawn(async move {
            let _ = agent_conn_run
                .run(agent_reader, Role::Agent(Arc::new(NaiveAgent)))
                .await;
        });

        let client_conn = Arc::new(Connection::new(client_writer));
        let client_conn_run = Arc::clone(&client_conn);
        tokio::spawn(async move {
            let _ = client_conn_run
                .run(client_reader, Role::Agent(Arc::new(NaiveAgent)))
                .await;
        });

        let session: NewSessionResponse = client_conn
            .send_request(
                "session/new",
                NewSessionRequest {
                    cwd: "/tmp".into(),
                    mcp_servers: vec![],
                    meta: None,
                },
            )
            .await
            .unwrap();
        assert_ne!(session.session_id.0, "whatever-i-like");
        assert!(!session.session_id.0.is_empty());
    }

    #[tokio::test]
    async fn unknown_request_method_returns_method_not_found_over_the_wire() {
        let (client_io, agent_io) = tokio::io::duplex(8192);
        let (agent_reader, agent_writer) = tokio::io::split(agent_io);
        let (client_reader, client_writer) = tokio::io::split(client_io);

        let agent_conn = Arc::new(Connection::new(agent_writer));
        let agent_conn_run = Arc::clone(&agent_conn);
        tokio::spawn(async move {
            let _ = agent_conn_run
                .run(agent_reader, Role::Agent(Arc::new(EchoAgent)))
                .await;
        });

        let client_conn = Arc::new(Connection::new(client_writer));
        let client_conn_run = Arc::clone(&client_conn);
        tokio::spawn(async move {
            let _ = client_conn_run
                .run(client_reader, Role::Agent(Arc::new(EchoAgent)))
                .await;
        });

        let err = client_conn
            .send_request::<_, Value>("nonexistent/method", json!({}))
            .await
            .unwrap_err();
        match err {
            Error::Peer(e) => assert_eq!(e.code, crate::error::METHOD_NOT_FOUND),
            other => panic!("expected Peer error, got {other:?}"),
        }
    }
}
