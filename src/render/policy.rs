use memchr::memrchr;

use crate::attachment::AttachmentTags;
use crate::config::RenderConfig;
use crate::util::byte_offset_of_char;

/// How much of a message to hand to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPlan {
    Full,
    /// Parse `text[..end]` only; `hidden_chars` characters stay unparsed.
    Prefix { end: usize, hidden_chars: usize },
}

impl RenderPlan {
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        match *self {
            RenderPlan::Full => text,
            RenderPlan::Prefix { end, .. } => &text[..end],
        }
    }

    #[must_use]
    pub fn hidden_chars(&self) -> usize {
        match *self {
            RenderPlan::Full => 0,
            RenderPlan::Prefix { hidden_chars, .. } => hidden_chars,
        }
    }
}

/// Prefix-only rendering for oversized messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeMessagePolicy {
    threshold: usize,
    preview: usize,
}

impl LargeMessagePolicy {
    #[must_use]
    pub fn new(threshold: usize, preview: usize) -> Self {
        Self {
            threshold,
            preview: preview.min(threshold),
        }
    }

    #[must_use]
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.large_message_threshold, config.large_message_preview)
    }

    /// Decide what to parse. Messages carrying attachment tags are always
    /// parsed whole so no reference is lost behind the cut.
    #[must_use]
    pub fn plan(&self, text: &str, tags: &AttachmentTags, full_requested: bool) -> RenderPlan {
        if full_requested || byte_offset_of_char(text, self.threshold).is_none() {
            return RenderPlan::Full;
        }
        if tags.contains_any(text) {
            return RenderPlan::Full;
        }

        let limit = byte_offset_of_char(text, self.preview).unwrap_or(text.len());
        // Prefer a line boundary, unless it would throw away most of the preview.
        let end = match memrchr(b'\n', &text.as_bytes()[..limit]) {
            Some(newline) if newline >= limit / 2 => newline,
            _ => limit,
        };
        RenderPlan::Prefix {
            end,
            hidden_chars: text[end..].chars().count(),
        }
    }
}
