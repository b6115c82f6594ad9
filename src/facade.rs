//! The role facade: `start_agent` and `start_client` (§2, §6.1).
//!
//! Grounded on the teacher's `run_stdio`/`main.rs` transport-mode
//! dispatch, which picks a transport and hands it to `ServerCompat`; here
//! `start_agent` inherits the process's own stdio (the agent is the
//! child a client spawns), and `start_client` spawns the agent
//! executable as a child and wires its stdio pipes as the transport —
//! the client-role counterpart the teacher never needed since it only
//! ever played the server/agent side.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::Instrument;

use crate::connection::{Connection, Role};
use crate::error::{Error, Result};
use crate::handler::{Agent, Client};

/// Options for [`start_agent`].
///
/// Per §6.5, `start_agent` recognizes `name` only — a logical name for
/// the connection, used nowhere but diagnostics.
#[derive(Default)]
pub struct StartAgentOptions {
    pub name: Option<String>,
}

/// Runs the current process as an agent speaking ACP over its own
/// stdin/stdout, driving `handler` until the client disconnects.
///
/// Per §A.1, stdout is reserved for protocol frames for the lifetime of
/// this call — nothing else may write to it.
pub async fn start_agent(
    handler: Arc<dyn Agent>,
    options: StartAgentOptions,
) -> Result<Arc<Connection<tokio::io::Stdout>>> {
    let conn = Arc::new(Connection::new(tokio::io::stdout()));
    let run_conn = Arc::clone(&conn);
    let name = options.name.unwrap_or_else(|| "agent".to_string());
    tokio::spawn(async move {
        let _ = run_conn
            .run(tokio::io::stdin(), Role::Agent(handler))
            .instrument(tracing::info_span!("connection", name = %name))
            .await;
    });
    Ok(conn)
}

/// Options for [`start_client`].
pub struct StartClientOptions {
    /// The agent executable to spawn. Resolved against `PATH` the same
    /// way `std::process::Command` resolves any bare program name.
    pub command: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// A logical name for the connection (§6.5); used only for
    /// diagnostics, not sent over the wire.
    pub name: Option<String>,
}

impl StartClientOptions {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            name: None,
        }
    }
}

/// Spawns `options.command` as a child process and drives `handler`
/// against the child's stdio pipes, playing the client role. Returns the
/// live connection (for issuing `initialize`/`session/new`/etc. requests
/// to the agent) alongside the child handle so the caller can manage its
/// lifetime.
pub async fn start_client(
    handler: Arc<dyn Client>,
    options: StartClientOptions,
) -> Result<(Arc<Connection<tokio::process::ChildStdin>>, tokio::process::Child)> {
    let mut command = Command::new(&options.command);
    command
        .args(&options.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }

    let mut child = command
        .spawn()
        .map_err(|_| Error::AgentNotFound(options.command.display().to_string()))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::AgentNotFound(options.command.display().to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::AgentNotFound(options.command.display().to_string()))?;

    let conn = Arc::new(Connection::new(stdin));
    let run_conn = Arc::clone(&conn);
    let name = options
        .name
        .unwrap_or_else(|| options.command.display().to_string());
    tokio::spawn(async move {
        let _ = run_conn
            .run(stdout, Role::Client(handler))
            .instrument(tracing::info_span!("connection", name = %name))
            .await;
    });

    Ok((conn, child))
}
