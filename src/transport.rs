//! Byte-stream transport: buffers inbound bytes and slices them into
//! frames with [`crate::frame`], and serializes writes so concurrent
//! senders don't interleave (§7).
//!
//! Grounded on the teacher's `CursorStdioTransport` (`mcp/cursor_stdio.rs`),
//! which owns a reader task feeding a channel and a mutex-guarded writer;
//! here the reader runs inline behind an `AsyncRead` instead of a spawned
//! task (the connection controller owns the read loop, see `connection.rs`),
//! and the writer lock is a `tokio::sync::Mutex` instead of `std::sync::Mutex`
//! since writes happen from async contexts.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::frame::{encode_frame, resync_point, try_decode_frame, FrameError};

/// A half-duplex reader that accumulates bytes and yields decoded frames.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Reads and decodes the next frame, pulling more bytes from the
    /// underlying stream as needed. Returns `Ok(None)` on clean EOF with
    /// no partial frame pending.
    ///
    /// A malformed frame (bad `Content-Length` headers, or a body that
    /// isn't valid JSON) is logged and discarded, never returned as an
    /// error: per §7, the engine never aborts the connection over a
    /// single malformed inbound message. The reader resyncs onto the
    /// next frame boundary and keeps going.
    pub async fn next_frame(&mut self) -> Result<Option<Value>> {
        loop {
            match try_decode_frame(&self.buf) {
                Ok(Some((value, consumed))) => {
                    self.buf.drain(0..consumed);
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(e @ (FrameError::InvalidHeaders | FrameError::InvalidJson(_))) => {
                    let skip = resync_point(&self.buf);
                    warn!(error = %e, skipped_bytes = skip, "discarding malformed frame and resyncing");
                    if skip > 0 {
                        self.buf.drain(0..skip);
                        continue;
                    }
                }
            }

            let mut chunk = [0u8; 8192];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream closed mid-frame",
                )));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// A writer that serializes concurrent frame writes behind a lock so two
/// tasks sending at once can't interleave their bytes on the wire (§7).
pub struct FrameWriter<W> {
    inner: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub async fn write_frame(&self, value: &Value) -> Result<()> {
        let bytes = encode_frame(value);
        let mut guard = self.inner.lock().await;
        guard.write_all(&bytes).await?;
        guard.flush().await?;
        Ok(())
    }
}
