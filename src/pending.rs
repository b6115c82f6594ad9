//! The pending-request table: tracks outbound requests awaiting a peer's
//! response, matched back up by id (§5, §6.2).
//!
//! Grounded on the teacher's `runtime.rs`, which keeps an
//! `Arc<RwLock<HashMap<_, _>>>` of in-flight state shared between the
//! read loop and the calling tasks; here the map holds oneshot senders
//! instead of raw state so the read loop can wake exactly one waiter per
//! reply.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::error::{Error, ProtocolError};
use crate::message::RequestId;

/// The outcome delivered to a caller of [`PendingRequests::wait`]: either
/// the peer's `result`, or its `error`.
pub type PeerReply = Result<Value, ProtocolError>;

#[derive(Default)]
struct Inner {
    waiters: HashMap<RequestId, oneshot::Sender<PeerReply>>,
}

/// Shared table of outbound requests awaiting a response. Cloning shares
/// the same underlying table (it's an `Arc` handle).
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<Inner>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` as awaiting a reply and returns a future that
    /// resolves once [`Self::resolve`] is called with the same id, or
    /// immediately with [`Error::ConnectionClosed`] if the table is
    /// dropped first.
    pub async fn wait(&self, id: RequestId) -> impl std::future::Future<Output = Result<PeerReply, Error>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().await;
            inner.waiters.insert(id, tx);
        }
        async move { rx.await.map_err(|_| Error::ConnectionClosed) }
    }

    /// Delivers a reply to the waiter registered for `id`, if any. A
    /// reply for an id nobody is waiting on (a late or duplicate
    /// response) is silently dropped.
    pub async fn resolve(&self, id: &RequestId, reply: PeerReply) {
        let sender = {
            let mut inner = self.inner.lock().await;
            inner.waiters.remove(id)
        };
        if let Some(sender) = sender {
            let _ = sender.send(reply);
        }
    }

    /// Fails every outstanding waiter with [`Error::ConnectionClosed`];
    /// called when the transport shuts down so callers don't hang
    /// forever.
    pub async fn fail_all(&self) {
        let waiters = {
            let mut inner = self.inner.lock().await;
            std::mem::take(&mut inner.waiters)
        };
        for (_, sender) in waiters {
            let _ = sender.send(Err(ProtocolError::internal_error("connection closed")));
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_matching_waiter() {
        let table = PendingRequests::new();
        let id = RequestId::Number(1);
        let fut = table.wait(id.clone()).await;
        table.resolve(&id, Ok(serde_json::json!({"ok": true}))).await;
        let reply = fut.await.unwrap();
        assert_eq!(reply.unwrap(), serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn late_reply_for_unknown_id_is_dropped() {
        let table = PendingRequests::new();
        table.resolve(&RequestId::Number(99), Ok(serde_json::Value::Null)).await;
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn fail_all_wakes_every_waiter_with_connection_closed() {
        let table = PendingRequests::new();
        let fut_a = table.wait(RequestId::Number(1)).await;
        let fut_b = table.wait(RequestId::Number(2)).await;
        table.fail_all().await;
        assert!(fut_a.await.unwrap().is_err());
        assert!(fut_b.await.unwrap().is_err());
    }
}
