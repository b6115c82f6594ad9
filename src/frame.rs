//! Content-Length framed JSON codec (§4.1).
//!
//! Framing is LSP-style: one or more `\r\n`-terminated header lines, then a
//! blank line, then exactly `Content-Length` bytes of UTF-8 JSON. Only
//! `Content-Length` is meaningful; other headers are ignored. `\n\n` is
//! tolerated as a header terminator on decode for interoperability, but
//! `encode_frame` always emits `\r\n\r\n`.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Content-Length header missing or not an integer")]
    InvalidHeaders,
    #[error("frame body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Attempts to decode one frame from the front of `buf`.
///
/// Returns `Ok(Some((value, consumed)))` when a complete frame was found,
/// where `consumed` is the number of bytes the caller should drain from the
/// front of its buffer. Returns `Ok(None)` when `buf` does not yet hold a
/// complete frame (the caller should wait for more bytes and retry with the
/// buffer untouched). Returns `Err` for a structurally invalid frame; the
/// caller's policy (per §7) is to log and discard it.
pub fn try_decode_frame(buf: &[u8]) -> Result<Option<(Value, usize)>, FrameError> {
    let Some((header_end, sep_len)) = find_header_terminator(buf) else {
        return Ok(None);
    };

    let header_block = std::str::from_utf8(&buf[..header_end]).map_err(|_| FrameError::InvalidHeaders)?;
    let content_length = parse_content_length(header_block).ok_or(FrameError::InvalidHeaders)?;

    let body_start = header_end + sep_len;
    let body_end = body_start + content_length;
    if buf.len() < body_end {
        return Ok(None);
    }

    let body = &buf[body_start..body_end];
    let value: Value = serde_json::from_slice(body)?;
    Ok(Some((value, body_end)))
}

/// Computes how many leading bytes of `buf` to discard after `try_decode_frame`
/// returned an `Err` for it, so the caller can resync onto the next frame
/// instead of retrying the same unparsable bytes forever (§7: a malformed
/// inbound frame is logged and discarded, never fatal to the connection).
///
/// Both `FrameError` variants only arise once a header terminator has been
/// located, so there is always a well-defined point to skip past: past the
/// whole frame (header + declared body) when the body was the problem, or
/// just past the header block when the headers themselves didn't parse.
pub fn resync_point(buf: &[u8]) -> usize {
    let Some((header_end, sep_len)) = find_header_terminator(buf) else {
        return 0;
    };
    let body_start = header_end + sep_len;
    let Ok(header_block) = std::str::from_utf8(&buf[..header_end]) else {
        return body_start;
    };
    match parse_content_length(header_block) {
        Some(content_length) => body_start + content_length,
        None => body_start,
    }
}

/// Serializes `value` to compact JSON and wraps it in a `Content-Length` frame.
pub fn encode_frame(value: &Value) -> Vec<u8> {
    let body = serde_json::to_vec(value).expect("Value always serializes");
    let mut out = Vec::with_capacity(body.len() + 32);
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(&body);
    out
}

fn find_header_terminator(buf: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = find_subslice(buf, b"\r\n\r\n") {
        return Some((pos, 4));
    }
    find_subslice(buf, b"\n\n").map(|pos| (pos, 2))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_content_length(header_block: &str) -> Option<usize> {
    header_block
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip() {
        let value = json!({"jsonrpc": "2.0", "id": 9, "method": "ping"});
        let framed = encode_frame(&value);
        let (decoded, consumed) = try_decode_frame(&framed).unwrap().unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn incomplete_headers_wait_for_more_bytes() {
        let buf = b"Content-Len";
        assert!(try_decode_frame(buf).unwrap().is_none());
    }

    #[test]
    fn incomplete_body_waits_for_more_bytes() {
        let value = json!({"jsonrpc": "2.0", "id": 1, "method": "x"});
        let framed = encode_frame(&value);
        let partial = &framed[..framed.len() - 3];
        assert!(try_decode_frame(partial).unwrap().is_none());
    }

    #[test]
    fn missing_content_length_is_invalid_headers() {
        let buf = b"X-Other: 1\r\n\r\n{}";
        assert!(matches!(
            try_decode_frame(buf),
            Err(FrameError::InvalidHeaders)
        ));
    }

    #[test]
    fn non_integer_content_length_is_invalid_headers() {
        let buf = b"Content-Length: abc\r\n\r\n{}";
        assert!(matches!(
            try_decode_frame(buf),
            Err(FrameError::InvalidHeaders)
        ));
    }

    #[test]
    fn invalid_json_body_is_rejected() {
        let buf = b"Content-Length: 3\r\n\r\nabc";
        assert!(matches!(
            try_decode_frame(buf),
            Err(FrameError::InvalidJson(_))
        ));
    }

    #[test]
    fn resync_point_skips_whole_frame_on_invalid_json_body() {
        let buf = b"Content-Length: 3\r\n\r\nabcXTRA";
        assert_eq!(resync_point(buf), "Content-Length: 3\r\n\r\nabc".len());
    }

    #[test]
    fn resync_point_skips_header_block_on_invalid_headers() {
        let buf = b"X-Other: 1\r\n\r\n{}";
        assert_eq!(resync_point(buf), "X-Other: 1\r\n\r\n".len());
    }

    #[test]
    fn legacy_lf_lf_separator_is_tolerated() {
        let buf = b"Content-Length: 2\n\n{}";
        let (decoded, consumed) = try_decode_frame(buf).unwrap().unwrap();
        assert_eq!(decoded, json!({}));
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn chunked_delivery_yields_one_request() {
        let chunks: [&[u8]; 4] = [
            b"Content-Len",
            b"gth: 27\r\n\r\n",
            b"{\"jsonrpc\":\"2.0\",\"id\":9,",
            b"\"method\":\"ping\"}",
        ];
        let mut buf = Vec::new();
        let mut decoded = None;
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            if let Some((value, consumed)) = try_decode_frame(&buf).unwrap() {
                decoded = Some(value);
                buf.drain(..consumed);
                break;
            }
        }
        let decoded = decoded.expect("frame should have been decoded once complete");
        assert_eq!(decoded["id"], json!(9));
        assert_eq!(decoded["method"], json!("ping"));
        assert!(buf.is_empty());
    }

    #[test]
    fn arbitrary_chunk_split_matches_unsplit_sequence() {
        let value = json!({"jsonrpc": "2.0", "id": 42, "method": "foo", "params": {"a": 1}});
        let framed = encode_frame(&value);

        // Un-split baseline.
        let (baseline, _) = try_decode_frame(&framed).unwrap().unwrap();

        // Split at every possible byte boundary and confirm the same result.
        for split in 1..framed.len() {
            let mut buf = framed[..split].to_vec();
            let first = try_decode_frame(&buf).unwrap();
            if let Some((decoded, consumed)) = first {
                assert_eq!(decoded, baseline);
                assert_eq!(consumed, framed.len());
                continue;
            }
            buf.extend_from_slice(&framed[split..]);
            let (decoded, consumed) = try_decode_frame(&buf).unwrap().unwrap();
            assert_eq!(decoded, baseline);
            assert_eq!(consumed, framed.len());
        }
    }
}
