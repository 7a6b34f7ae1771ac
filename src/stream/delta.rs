//! Provider event payloads → accumulated assistant text.
//!
//! Payload shapes are detected structurally rather than by configured
//! provider, so one accumulator handles OpenAI-style chat chunks,
//! Anthropic-style message events and local-runtime NDJSON lines.
//!
//! Reasoning deltas are wrapped in `<think>` … `</think>` so the incremental
//! parser renders them as a thinking block ahead of the answer.

use serde::Deserialize;
use serde_json::Value;

use super::sse::is_done_payload;

pub(crate) const THINK_OPEN_LINE: &str = "<think>\n";
pub(crate) const THINK_CLOSE_LINE: &str = "\n</think>\n\n";

/// One decoded unit of a provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    Text(String),
    Reasoning(String),
    Error(String),
    Done,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    delta: Option<WireBlockDelta>,
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: Option<WireMessage>,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBlockDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

impl WireMessage {
    fn push_deltas(self, out: &mut Vec<StreamDelta>) {
        let reasoning = self
            .reasoning_content
            .or(self.reasoning)
            .or(self.thinking)
            .filter(|r| !r.is_empty());
        if let Some(reasoning) = reasoning {
            out.push(StreamDelta::Reasoning(reasoning));
        }
        if let Some(Value::String(content)) = self.content {
            if !content.is_empty() {
                out.push(StreamDelta::Text(content));
            }
        }
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        other => other.to_string(),
    }
}

/// Decode one SSE payload into zero or more deltas.
///
/// Payloads that are not JSON, or JSON that matches no known shape, decode to
/// nothing; keep-alives and bookkeeping events are common and not errors.
#[must_use]
pub fn decode_payload(payload: &str) -> Vec<StreamDelta> {
    if is_done_payload(payload) {
        return vec![StreamDelta::Done];
    }
    let chunk: WireChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::trace!("ignoring non-JSON stream payload: {err}");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    if let Some(error) = chunk.error.as_ref() {
        out.push(StreamDelta::Error(error_message(error)));
        return out;
    }

    match chunk.kind.as_deref() {
        Some("content_block_delta") => {
            if let Some(delta) = chunk.delta {
                if let Some(thinking) = delta.thinking.filter(|t| !t.is_empty()) {
                    out.push(StreamDelta::Reasoning(thinking));
                }
                if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                    out.push(StreamDelta::Text(text));
                }
            }
            return out;
        }
        Some("message_stop") => {
            out.push(StreamDelta::Done);
            return out;
        }
        _ => {}
    }

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(delta) = choice.delta.or(choice.message) {
            delta.push_deltas(&mut out);
        }
    } else if chunk.kind.is_none() {
        // NDJSON chat lines from local runtimes.
        if let Some(message) = chunk.message {
            message.push_deltas(&mut out);
        }
    }
    if chunk.done {
        out.push(StreamDelta::Done);
    }
    out
}

/// Accumulates decoded deltas into the full assistant text.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    text: String,
    in_reasoning: bool,
    done: bool,
    errors: Vec<String>,
}

impl DeltaAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one SSE payload. Returns `true` when the text changed.
    pub fn apply_payload(&mut self, payload: &str) -> bool {
        let mut changed = false;
        for delta in decode_payload(payload) {
            changed |= self.apply(delta);
        }
        changed
    }

    /// Apply one decoded delta. Returns `true` when the text changed.
    pub fn apply(&mut self, delta: StreamDelta) -> bool {
        match delta {
            StreamDelta::Reasoning(reasoning) => {
                if !self.in_reasoning {
                    if !self.text.is_empty() && !self.text.ends_with('\n') {
                        self.text.push('\n');
                    }
                    self.text.push_str(THINK_OPEN_LINE);
                    self.in_reasoning = true;
                }
                self.text.push_str(&reasoning);
                true
            }
            StreamDelta::Text(text) => {
                self.close_reasoning();
                self.text.push_str(&text);
                true
            }
            StreamDelta::Error(message) => {
                tracing::warn!("provider reported a stream error: {message}");
                self.errors.push(message);
                false
            }
            StreamDelta::Done => {
                self.done = true;
                self.close_reasoning()
            }
        }
    }

    /// Close an open reasoning segment. Returns `true` when text was appended.
    pub fn close_reasoning(&mut self) -> bool {
        if !self.in_reasoning {
            return false;
        }
        self.in_reasoning = false;
        self.text.push_str(THINK_CLOSE_LINE);
        true
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Consume the accumulator, closing any open reasoning segment.
    #[must_use]
    pub fn into_text(mut self) -> String {
        self.close_reasoning();
        self.text
    }
}
