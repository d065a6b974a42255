//! Server-sent event framing for the streaming REST protocol.
//!
//! The store streams `event:`/`data:` pairs separated by blank lines. The
//! data of `put` and `patch` events is `{"path": ..., "data": ...}`.

use serde::Deserialize;
use serde_json::Value;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name (`put`, `patch`, `keep-alive`, `cancel`, `auth_revoked`).
    pub event: String,
    /// Concatenated `data:` lines.
    pub data: String,
}

/// Body of a `put` or `patch` event.
#[derive(Debug, Deserialize)]
pub struct StreamChange {
    /// Path of the change relative to the watched location.
    pub path: String,
    /// New value at that path.
    #[serde(default)]
    pub data: Value,
}

/// Incremental SSE decoder.
///
/// Feed it raw chunks as they arrive; complete events come out as soon as
/// their terminating blank line has been seen.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and drain every complete event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        // Bytes are buffered so a multi-byte character split across chunks
        // is decoded only once complete.
        self.buffer.extend(chunk.iter().filter(|&&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.to_owned()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event.unwrap_or_else(|| "message".to_owned()),
        data: data.join("\n"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: put\ndata: {\"path\":\"/\",").is_empty());

        let events = decoder.push(b"\"data\":null}\n\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "put");
        assert_eq!(events[1].event, "keep-alive");

        let change: StreamChange = serde_json::from_str(&events[0].data).unwrap();
        assert_eq!(change.path, "/");
        assert!(change.data.is_null());
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": hello\r\nevent: cancel\r\ndata: denied\r\n\r\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "cancel".to_owned(),
                data: "denied".to_owned(),
            }]
        );
    }

    #[test]
    fn test_comment_only_block_is_skipped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b": ping\n\n").is_empty());
    }
}
