//! Wire-level helpers for `/api/chat`: the `data:`-framed stream format and
//! error-message extraction from non-success bodies.
//!
//! Everything here is pure so the adapters stay thin and the parsing is
//! testable without a browser.

use crate::ports::ChatStreamEvent;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";
const ERROR_PREFIX: &str = "ERROR: ";

/// Parse one complete line of the stream. Lines without the `data: ` prefix
/// (blank separators, comments) carry nothing.
pub fn parse_frame(line: &str) -> Option<ChatStreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_MARKER {
        return Some(ChatStreamEvent::Done);
    }
    if let Some(message) = payload.strip_prefix(ERROR_PREFIX) {
        return Some(ChatStreamEvent::Error(message.to_string()));
    }
    Some(ChatStreamEvent::Delta(payload.to_string()))
}

/// Accumulates raw network chunks and yields events for every complete
/// line. Splitting happens on bytes so a UTF-8 sequence straddling a chunk
/// boundary is never cut mid-character.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the events of every line completed
    /// by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ChatStreamEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            if let Some(event) = parse_frame(text.trim_end_matches(&['\n', '\r'][..])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever remains once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        if self.buf.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&line);
        parse_frame(text.trim_end_matches(&['\n', '\r'][..]))
            .into_iter()
            .collect()
    }
}

/// Best-effort display message for a non-success response body.
/// Precedence: JSON `error` field, HTML `<title>` or `<h1>` text, the raw
/// body, then a generic fallback naming the status.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }

    if let Some(text) = html_tag_text(body, "title").or_else(|| html_tag_text(body, "h1")) {
        return text;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    format!("server error ({})", status)
}

/// Text content of the first `<tag ...>...</tag>` occurrence, if any.
/// Tag matching is case-insensitive; attributes are tolerated.
fn html_tag_text(body: &str, tag: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let open_at = lower.find(&format!("<{}", tag))?;
    let content_at = open_at + lower[open_at..].find('>')? + 1;
    let close_at = content_at + lower[content_at..].find(&format!("</{}", tag))?;
    let text = body[content_at..close_at].trim();
    (!text.is_empty()).then(|| text.to_string())
}
