//! SSE decoding for streamed chat completions.
//!
//! Bytes are buffered until a blank line closes a frame; the `data:` lines of
//! the frame are joined and handed to the mode's driver. `[DONE]` ends the
//! stream. A chunk the driver cannot parse is yielded as an error and ends the
//! stream.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures::{stream, StreamExt};

use crate::drivers::ProtocolDriver;
use crate::transport::TransportError;
use crate::types::{NormalizedResult, StreamEvent};
use crate::{BoxStream, Error, Result};

const FRAME_DELIMITER: &[u8] = b"\n\n";

struct DecodeState {
    input: BoxStream<'static, Bytes>,
    buf: Vec<u8>,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Rewrite `\r\n` as `\n` in place. A trailing `\r` is kept until its pair
/// arrives.
fn normalize_crlf(buf: &mut Vec<u8>) {
    if find(buf, b"\r\n").is_none() {
        return;
    }
    let mut out = Vec::with_capacity(buf.len());
    let mut iter = buf.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&b'\n') {
            continue;
        }
        out.push(b);
    }
    *buf = out;
}

/// Extract the data payload of one SSE frame. Comment and field lines other
/// than `data:` are ignored.
fn frame_payload(frame: &str) -> Option<String> {
    let mut data: Vec<&str> = Vec::new();
    for line in frame.lines() {
        let line = line.trim_end();
        if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data.is_empty() {
        // Some gateways send bare JSON lines without the `data:` field.
        let trimmed = frame.trim();
        if trimmed.starts_with('{') {
            return Some(trimmed.to_string());
        }
        return None;
    }
    Some(data.join("\n"))
}

/// Decode an SSE byte stream into [`StreamEvent`]s with the given driver.
///
/// Frames are split on raw bytes and decoded as UTF-8 only once complete, so a
/// character split across network chunks survives. If no bytes arrive for
/// `idle_timeout`, the stream yields [`TransportError::Timeout`] and ends.
pub fn decode_sse(
    input: BoxStream<'static, Bytes>,
    driver: &'static dyn ProtocolDriver,
    idle_timeout: Duration,
) -> BoxStream<'static, StreamEvent> {
    let state = DecodeState {
        input,
        buf: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = stream::unfold(state, move |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished {
                return None;
            }

            let frame = if let Some(idx) = find(&st.buf, FRAME_DELIMITER) {
                let frame = String::from_utf8_lossy(&st.buf[..idx]).into_owned();
                st.buf.drain(..idx + FRAME_DELIMITER.len());
                frame
            } else {
                match tokio::time::timeout(idle_timeout, st.input.next()).await {
                    Err(_) => {
                        st.finished = true;
                        return Some((
                            Err(Error::Transport(TransportError::Timeout(idle_timeout))),
                            st,
                        ));
                    }
                    Ok(Some(Ok(bytes))) => {
                        st.buf.extend_from_slice(&bytes);
                        normalize_crlf(&mut st.buf);
                        continue;
                    }
                    Ok(Some(Err(e))) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                    Ok(None) => {
                        // EOF: flush whatever is left as a final frame.
                        st.finished = true;
                        let rest = std::mem::take(&mut st.buf);
                        String::from_utf8_lossy(&rest).into_owned()
                    }
                }
            };

            let Some(payload) = frame_payload(&frame) else {
                continue;
            };
            if driver.is_stream_done(&payload) {
                st.finished = true;
                st.pending.clear();
                return None;
            }
            match driver.parse_stream_chunk(&payload) {
                Ok(events) => st.pending.extend(events),
                Err(e) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
            }
        }
    });

    Box::pin(stream)
}

/// Fold a stream of events into a single [`NormalizedResult`].
///
/// Deltas are concatenated in order; the last finish reason and usage win.
pub async fn collect_stream(mut events: BoxStream<'_, StreamEvent>) -> Result<NormalizedResult> {
    let mut result = NormalizedResult::default();
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::ContentDelta { content } => result.response_text.push_str(&content),
            StreamEvent::Finish { finish_reason } => result.finish_reason = Some(finish_reason),
            StreamEvent::Usage { usage } => result.usage_info = usage,
        }
    }
    Ok(result)
}
