/// SSE (Server-Sent Events) frame parser.
///
/// Turns raw response-body bytes into event payload strings. Lines are split
/// at the byte level so a final line without a terminator is still seen by
/// [`SseParser::finish_into`], and a partial multi-byte sequence can never be
/// cut in half by a line break.
///
/// Field semantics follow the
/// [SSE specification](https://html.spec.whatwg.org/multipage/server-sent-events.html),
/// except that only `data` is surfaced and the delivery mode decides when a
/// payload is emitted.
use super::SseDeliveryMode;
use crate::json_scan::looks_like_complete_json;
use memchr::memchr_iter;

const DONE_SENTINEL: &str = "[DONE]";
const COMPACT_THRESHOLD: usize = 8 * 1024;

/// Incremental SSE parser.
///
/// Feed it raw byte chunks (arriving on arbitrary boundaries) and it yields
/// event payloads in arrival order. Call [`SseParser::finish_into`] once the
/// source is exhausted to flush whatever the provider left unterminated.
pub struct SseParser {
    mode: SseDeliveryMode,
    buffer: Vec<u8>,
    read_offset: usize,
    data_buffer: String,
    has_data: bool,
}

impl SseParser {
    #[must_use]
    pub fn new(mode: SseDeliveryMode) -> Self {
        Self {
            mode,
            buffer: Vec::new(),
            read_offset: 0,
            data_buffer: String::new(),
            has_data: false,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SseDeliveryMode {
        self.mode
    }

    /// Feed raw bytes and return any events completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw bytes and append completed events into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<String>) {
        self.buffer.extend_from_slice(chunk);
        let mut processed_up_to = self.read_offset;
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &self.buffer[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let line = &self.buffer[processed_up_to..line_end];
            Self::process_line(
                self.mode,
                line,
                &mut self.data_buffer,
                &mut self.has_data,
                out,
            );
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2
                || self.read_offset >= COMPACT_THRESHOLD);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Signal end of stream: process the unterminated last line, then flush
    /// any buffered data exactly once.
    pub fn finish_into(&mut self, out: &mut Vec<String>) {
        if self.read_offset < self.buffer.len() {
            let line = &self.buffer[self.read_offset..];
            Self::process_line(
                self.mode,
                line,
                &mut self.data_buffer,
                &mut self.has_data,
                out,
            );
        }
        self.buffer.clear();
        self.read_offset = 0;
        Self::flush_data(&mut self.data_buffer, &mut self.has_data, out);
    }

    /// Convenience wrapper around [`SseParser::finish_into`].
    pub fn finish(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        self.finish_into(&mut out);
        out
    }

    fn process_line(
        mode: SseDeliveryMode,
        line: &[u8],
        data_buffer: &mut String,
        has_data: &mut bool,
        events: &mut Vec<String>,
    ) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Ok(line) = std::str::from_utf8(line) else {
            tracing::trace!(len = line.len(), "dropping SSE line with invalid UTF-8");
            return;
        };

        if line.is_empty() {
            // Blank line = dispatch buffered event
            if mode != SseDeliveryMode::LineByLine {
                Self::flush_data(data_buffer, has_data, events);
            }
            return;
        }

        // Comment line
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field != "data" {
            // event/id/retry and unknown fields carry nothing we deliver
            return;
        }

        match mode {
            SseDeliveryMode::LineByLine => {
                let payload = value.trim();
                if !payload.is_empty() {
                    events.push(payload.to_string());
                }
            }
            SseDeliveryMode::BufferedEvents => {
                Self::append_data(data_buffer, has_data, value);
            }
            SseDeliveryMode::BufferedWithCompatibilityFlush => {
                Self::append_data(data_buffer, has_data, value);
                let joined = data_buffer.trim();
                if joined == DONE_SENTINEL || looks_like_complete_json(joined.as_bytes()) {
                    Self::flush_data(data_buffer, has_data, events);
                }
            }
        }
    }

    #[inline]
    fn append_data(data_buffer: &mut String, has_data: &mut bool, value: &str) {
        if *has_data {
            data_buffer.push('\n');
        } else {
            *has_data = true;
        }
        data_buffer.push_str(value);
    }

    #[inline]
    fn flush_data(data_buffer: &mut String, has_data: &mut bool, events: &mut Vec<String>) {
        if !*has_data {
            return;
        }
        let payload = data_buffer.trim();
        if !payload.is_empty() {
            events.push(payload.to_string());
        }
        data_buffer.clear();
        *has_data = false;
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new(SseDeliveryMode::default())
    }
}

/// Check if a payload is the terminal `[DONE]` sentinel.
#[must_use]
pub fn is_done_payload(payload: &str) -> bool {
    payload.trim() == DONE_SENTINEL
}

/// Encode a payload as a single `data:` frame with a blank-line terminator.
#[must_use]
pub fn encode_data_frame(payload: &str) -> String {
    let mut out = String::with_capacity(8 + payload.len());
    for line in payload.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(mode: SseDeliveryMode, input: &[u8]) -> Vec<String> {
        let mut parser = SseParser::new(mode);
        let mut events = parser.feed(input);
        events.extend(parser.finish());
        events
    }

    // -- BufferedEvents --

    #[test]
    fn test_strict_multiline_data() {
        let events = feed_all(
            SseDeliveryMode::BufferedEvents,
            b"data: line1\ndata: line2\n\n",
        );
        assert_eq!(events, vec!["line1\nline2"]);
    }

    #[test]
    fn test_strict_waits_for_blank_line() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedEvents);
        assert!(parser.feed(b"data: {\"a\":1}\n").is_empty());
        assert_eq!(parser.feed(b"\n"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_strict_multiple_frames() {
        let events = feed_all(
            SseDeliveryMode::BufferedEvents,
            b"data: first\n\ndata: second\n\n",
        );
        assert_eq!(events, vec!["first", "second"]);
    }

    #[test]
    fn test_payload_is_trimmed() {
        let events = feed_all(SseDeliveryMode::BufferedEvents, b"data:   padded  \n\n");
        assert_eq!(events, vec!["padded"]);
    }

    #[test]
    fn test_blank_data_is_not_emitted() {
        let events = feed_all(SseDeliveryMode::BufferedEvents, b"data:\n\n\n\n");
        assert!(events.is_empty());
    }

    // -- BufferedWithCompatibilityFlush --

    #[test]
    fn test_compat_flushes_complete_json_without_blank_line() {
        let events = feed_all(
            SseDeliveryMode::BufferedWithCompatibilityFlush,
            b"data: {\"a\":1}\ndata: {\"b\":2}\n",
        );
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_compat_flushes_done_sentinel() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedWithCompatibilityFlush);
        let events = parser.feed(b"data: [DONE]\n");
        assert_eq!(events, vec!["[DONE]"]);
        assert!(is_done_payload(&events[0]));
    }

    #[test]
    fn test_compat_joins_split_json_object() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedWithCompatibilityFlush);
        assert!(parser.feed(b"data: {\"a\":\n").is_empty());
        assert_eq!(parser.feed(b"data: 1}\n"), vec!["{\"a\":\n1}"]);
        // The following blank line has nothing left to flush.
        assert!(parser.feed(b"\n").is_empty());
    }

    #[test]
    fn test_compat_plain_text_still_needs_blank_line() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedWithCompatibilityFlush);
        assert!(parser.feed(b"data: hello\n").is_empty());
        assert_eq!(parser.feed(b"\n"), vec!["hello"]);
    }

    // -- LineByLine --

    #[test]
    fn test_line_by_line_emits_each_data_line() {
        let events = feed_all(
            SseDeliveryMode::LineByLine,
            b"data: one\ndata: two\n\ndata:\ndata: three\n",
        );
        assert_eq!(events, vec!["one", "two", "three"]);
    }

    // -- Field handling --

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let events = feed_all(
            SseDeliveryMode::BufferedEvents,
            b": keep-alive\nevent: message_start\nid: 7\nretry: 100\nfoo\ndata: x\n\n",
        );
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_data_without_space_after_colon() {
        let events = feed_all(SseDeliveryMode::BufferedEvents, b"data:nospace\n\n");
        assert_eq!(events, vec!["nospace"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let events = feed_all(SseDeliveryMode::BufferedEvents, b"data: hello\r\n\r\n");
        assert_eq!(events, vec!["hello"]);
    }

    #[test]
    fn test_invalid_utf8_line_dropped() {
        let mut input = b"data: ".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\ndata: {\"ok\":true}\n");
        let events = feed_all(SseDeliveryMode::BufferedWithCompatibilityFlush, &input);
        assert_eq!(events, vec!["{\"ok\":true}"]);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.len() - 3; // inside the two-byte 'é'
        let mut parser = SseParser::new(SseDeliveryMode::BufferedEvents);
        assert!(parser.feed(&text[..split]).is_empty());
        assert_eq!(parser.feed(&text[split..]), vec!["caf\u{e9}"]);
    }

    // -- End of stream --

    #[test]
    fn test_trailing_flush_without_blank_line() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedWithCompatibilityFlush);
        assert!(parser.feed(b"data: partial answer\n").is_empty());
        assert_eq!(parser.finish(), vec!["partial answer"]);
        // Flushed once only.
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_trailing_unterminated_line_is_processed() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedEvents);
        assert!(parser.feed(b"data: tail without newline").is_empty());
        assert_eq!(parser.finish(), vec!["tail without newline"]);
    }

    #[test]
    fn test_incremental_byte_by_byte() {
        let input = b"data: {\"x\":1}\n\ndata: [DONE]\n\n";
        let mut parser = SseParser::default();
        let mut events = Vec::new();
        for byte in input {
            parser.feed_into(std::slice::from_ref(byte), &mut events);
        }
        parser.finish_into(&mut events);
        assert_eq!(events, vec!["{\"x\":1}", "[DONE]"]);
    }

    #[test]
    fn test_feed_into_appends_without_clearing_output() {
        let mut parser = SseParser::new(SseDeliveryMode::BufferedEvents);
        let mut out = vec!["seed".to_string()];
        parser.feed_into(b"data: a\n\n", &mut out);
        assert_eq!(out, vec!["seed", "a"]);
    }

    // -- Encoding --

    #[test]
    fn test_encode_data_frame() {
        assert_eq!(encode_data_frame("{\"a\":1}"), "data: {\"a\":1}\n\n");
        assert_eq!(encode_data_frame("l1\nl2"), "data: l1\ndata: l2\n\n");
    }
}
