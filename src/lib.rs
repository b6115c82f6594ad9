//! Agent Client Protocol: a bidirectional JSON-RPC 2.0 connection engine
//! over stdio (§1, §2).
//!
//! The wire-format layer (`frame`, `message`) is transport-agnostic; the
//! `types` module defines every record the protocol exchanges; `handler`
//! defines the two traits an embedder implements (`Agent`, `Client`);
//! `connection` drives the read loop and dispatch; `facade` is the
//! entry point most embedders actually call (`start_agent`,
//! `start_client`).

#![allow(clippy::too_many_arguments)]
#![allow(clippy::result_large_err)]

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod frame;
pub mod handler;
pub mod message;
pub mod pending;
pub mod session;
pub mod transport;
pub mod types;

pub use connection::{Connection, Role};
pub use error::{Error, ProtocolError, Result};
pub use facade::{start_agent, start_client, StartAgentOptions, StartClientOptions};
pub use handler::{Agent, Client};
pub use session::{CancellationToken, SessionRegistry, SessionState};
