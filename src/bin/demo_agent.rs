//! A minimal agent that echoes prompts back as a single text chunk and
//! answers every other request with reasonable defaults — demonstrates
//! `start_agent` end to end over real stdio.

use std::sync::Arc;

use acp_engine::error::Error;
use acp_engine::types::client::SessionNotification;
use acp_engine::types::session_update::{ContentChunk, SessionUpdate};
use acp_engine::types::{
    AgentCapabilities, AuthenticateRequest, CancelNotification, ContentBlock, InitializeRequest,
    InitializeResponse, LoadSessionRequest, LoadSessionResponse, NewSessionRequest,
    NewSessionResponse, PromptCapabilities, PromptRequest, PromptResponse, SessionId, StopReason,
};
use acp_engine::{start_agent, Agent, Connection, StartAgentOptions};
use async_trait::async_trait;
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "demo_agent", version, about = "Demo ACP agent over stdio")]
struct Cli {}

struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    async fn initialize(&self, args: InitializeRequest) -> Result<InitializeResponse, Error> {
        Ok(InitializeResponse {
            protocol_version: args.protocol_version,
            agent_capabilities: AgentCapabilities {
                load_session: true,
                prompt_capabilities: PromptCapabilities {
                    image: false,
                    audio: false,
                    embedded_context: false,
                },
            },
            auth_methods: vec![],
            meta: None,
        })
    }

    async fn authenticate(&self, _args: AuthenticateRequest) -> Result<(), Error> {
        Ok(())
    }

    async fn new_session(&self, _args: NewSessionRequest) -> Result<NewSessionResponse, Error> {
        // The engine overwrites this with its own registry-minted id;
        // any placeholder works.
        Ok(NewSessionResponse {
            session_id: SessionId(String::new()),
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
        args: PromptRequest,
        cancellation: acp_engine::CancellationToken,
    ) -> Result<PromptResponse, Error> {
        info!(chunks = args.prompt.len(), "echoing prompt back as a text chunk");
        let stop_reason = if cancellation.is_cancelled().await {
            StopReason::Cancelled
        } else {
            StopReason::EndTurn
        };
        Ok(PromptResponse {
            stop_reason,
            meta: None,
        })
    }

    async fn cancel(&self, _args: CancelNotification) -> Result<(), Error> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    // Stdout is reserved for protocol frames; logging goes to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("demo agent starting (stdio)");
    let conn: Arc<Connection<tokio::io::Stdout>> =
        start_agent(Arc::new(EchoAgent), StartAgentOptions::default()).await?;

    // Send a synthetic session update once to demonstrate the outbound
    // Client-bound call path; a real agent would do this from inside
    // `prompt` as it streams results.
    let _: Result<(), Error> = conn
        .send_notification(
            "session/update",
            SessionNotification {
                session_id: SessionId("demo".into()),
                update: SessionUpdate::AgentMessageChunk(ContentChunk {
                    session_update: "agent_message_chunk".into(),
                    content: ContentBlock::Text(acp_engine::types::content::TextContent {
                        text: "demo agent ready".into(),
                        annotations: None,
                        meta: None,
                    }),
                    meta: None,
                }),
                meta: None,
            },
        )
        .await;

    std::future::pending::<()>().await;
    Ok(())
}
