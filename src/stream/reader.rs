//! Async read loops around [`SseParser`].
//!
//! One loop per open connection. The loop is the only writer of its parser
//! state and the only producer of events, so event N is always delivered
//! before event N+1.

use super::{SseDeliveryMode, SseParser};
use futures_util::Stream;
use smallvec::SmallVec;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

struct PendingEvents {
    events: SmallVec<[String; 8]>,
    head: usize,
}

impl PendingEvents {
    #[inline]
    fn new() -> Self {
        Self {
            events: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<String> {
        if self.head >= self.events.len() {
            return None;
        }
        let event = std::mem::take(&mut self.events[self.head]);
        self.head += 1;
        if self.head == self.events.len() {
            self.events.clear();
            self.head = 0;
        }
        Some(event)
    }

    #[inline]
    fn extend_from_vec(&mut self, parsed: &mut Vec<String>) {
        if parsed.is_empty() {
            return;
        }
        self.events.reserve(parsed.len());
        self.events.extend(parsed.drain(..));
    }
}

/// Summary of a finished [`read_sse_events`] loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub events: usize,
    pub bytes: usize,
    pub cancelled: bool,
}

/// Read an SSE body to the end, invoking `on_event` for every payload.
///
/// The cancellation token is checked at every read suspension point. A
/// cancelled loop returns immediately and does not flush residual data,
/// since a superseded request has no consumer for it.
///
/// # Errors
///
/// Returns the underlying I/O error when a read fails. Framing problems are
/// never errors.
pub async fn read_sse_events<R, F>(
    mut reader: R,
    mode: SseDeliveryMode,
    read_buffer_size: usize,
    cancel: &CancellationToken,
    mut on_event: F,
) -> std::io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut parser = SseParser::new(mode);
    let mut buf = vec![0u8; read_buffer_size.max(1)];
    let mut parsed = Vec::with_capacity(8);
    let mut outcome = ReadOutcome {
        events: 0,
        bytes: 0,
        cancelled: false,
    };

    loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                outcome.cancelled = true;
                tracing::debug!(events = outcome.events, "SSE read loop cancelled");
                return Ok(outcome);
            }
            read = reader.read(&mut buf) => read?,
        };

        if read == 0 {
            parser.finish_into(&mut parsed);
        } else {
            outcome.bytes += read;
            parser.feed_into(&buf[..read], &mut parsed);
        }

        for event in parsed.drain(..) {
            outcome.events += 1;
            on_event(event);
        }

        if read == 0 {
            tracing::debug!(
                events = outcome.events,
                bytes = outcome.bytes,
                "SSE stream finished"
            );
            return Ok(outcome);
        }
    }
}

/// Split a byte stream into SSE event payloads.
///
/// Bytes arriving from an HTTP response body are fed into an [`SseParser`]
/// and each completed payload is yielded in order. When the source ends, the
/// parser is finished so a trailing unterminated event is still delivered.
pub fn sse_event_stream<S, E>(
    byte_stream: S,
    mode: SseDeliveryMode,
) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: std::fmt::Debug + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            SseParser::new(mode),
            Vec::<String>::with_capacity(8),
            PendingEvents::new(),
            false,
        ),
        |(mut stream, mut parser, mut parsed, mut pending, mut finished)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((event, (stream, parser, parsed, pending, finished)));
                }
                if finished {
                    return None;
                }

                match stream.as_mut().next().await {
                    Some(Ok(bytes)) => parser.feed_into(&bytes, &mut parsed),
                    Some(Err(err)) => {
                        tracing::debug!("SSE byte stream yielded an error chunk: {err:?}");
                    }
                    None => {
                        parser.finish_into(&mut parsed);
                        finished = true;
                    }
                }
                pending.extend_from_vec(&mut parsed);
            }
        },
    )
}
