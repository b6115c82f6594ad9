//! A minimal client that spawns an agent executable, performs the
//! `initialize` / `session/new` / `session/prompt` handshake, and prints
//! whatever the agent sends back — demonstrates `start_client` end to
//! end against a real child process.

use std::path::PathBuf;
use std::sync::Arc;

use acp_engine::error::Error;
use acp_engine::types::client::{
    ReadTextFileRequest, ReadTextFileResponse, RequestPermissionRequest,
    RequestPermissionResponse, SessionNotification, WriteTextFileRequest, WriteTextFileResponse,
};
use acp_engine::types::content::TextContent;
use acp_engine::types::{
    ClientCapabilities, ContentBlock, InitializeRequest, InitializeResponse, NewSessionRequest,
    NewSessionResponse, ProtocolVersion, PromptRequest, PromptResponse,
};
use acp_engine::{start_client, Client, StartClientOptions};
use async_trait::async_trait;
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "demo_client", version, about = "Demo ACP client driving a spawned agent")]
struct Cli {
    /// Path to the agent executable to spawn.
    agent: PathBuf,

    /// Working directory to hand the agent in `session/new`.
    #[arg(long, default_value = ".")]
    cwd: PathBuf,
}

struct LoggingClient;

#[async_trait]
impl Client for LoggingClient {
    async fn session_update(&self, args: SessionNotification) {
        info!(session_id = %args.session_id, update = ?args.update, "session update");
    }

    async fn request_permission(
        &self,
        args: RequestPermissionRequest,
    ) -> Result<RequestPermissionResponse, Error> {
        info!(tool_call_id = %args.tool_call_id, "auto-granting permission request");
        Ok(RequestPermissionResponse {
            outcome: acp_engine::types::client::RequestPermissionOutcome::Selected {
                option_id_index: 0,
            },
            meta: None,
        })
    }

    async fn write_text_file(
        &self,
        args: WriteTextFileRequest,
    ) -> Result<WriteTextFileResponse, Error> {
        std::fs::write(&args.path, &args.content).map_err(Error::Io)?;
        Ok(WriteTextFileResponse { meta: None })
    }

    async fn read_text_file(
        &self,
        args: ReadTextFileRequest,
    ) -> Result<ReadTextFileResponse, Error> {
        let content = std::fs::read_to_string(&args.path).map_err(Error::Io)?;
        Ok(ReadTextFileResponse { content, meta: None })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (conn, mut child) = start_client(
        Arc::new(LoggingClient),
        StartClientOptions::new(cli.agent),
    )
    .await?;

    let init: InitializeResponse = conn
        .send_request(
            "initialize",
            InitializeRequest {
                protocol_version: ProtocolVersion::LATEST,
                client_capabilities: ClientCapabilities::default(),
                meta: None,
            },
        )
        .await?;
    info!(protocol_version = init.protocol_version.0, "agent initialized");

    let session: NewSessionResponse = conn
        .send_request(
            "session/new",
            NewSessionRequest {
                cwd: cli.cwd,
                mcp_servers: vec![],
                meta: None,
            },
        )
        .await?;
    info!(session_id = %session.session_id, "session created");

    let prompt: PromptResponse = conn
        .send_request(
            "session/prompt",
            PromptRequest {
                session_id: session.session_id,
                prompt: vec![ContentBlock::Text(TextContent {
                    text: "hello from demo_client".into(),
                    annotations: None,
                    meta: None,
                })],
                meta: None,
            },
        )
        .await?;
    info!(stop_reason = ?prompt.stop_reason, "prompt turn finished");

    child.wait().await?;
    Ok(())
}
