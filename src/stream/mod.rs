pub mod delta;
pub mod reader;
pub mod sse;

pub use delta::{DeltaAccumulator, StreamDelta};
pub use reader::{read_sse_events, sse_event_stream, ReadOutcome};
pub use sse::{encode_data_frame, is_done_payload, SseParser};

use serde::{Deserialize, Serialize};

/// When buffered `data:` lines are handed to the event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SseDeliveryMode {
    /// Every non-empty `data` line is its own event.
    LineByLine,
    /// Strict SSE: data lines accumulate until a blank line.
    BufferedEvents,
    /// Strict SSE, plus an early flush once the buffered payload is `[DONE]`
    /// or structurally a complete JSON object/array.
    #[default]
    BufferedWithCompatibilityFlush,
}
