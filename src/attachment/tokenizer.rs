use uuid::Uuid;

use super::tags::{AttachmentTags, TagKind};

/// One piece of tokenized message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentToken {
    Text(String),
    Image(Uuid),
    File(Uuid),
}

#[inline]
fn push_text(tokens: &mut Vec<AttachmentToken>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(AttachmentToken::Text(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(AttachmentToken::Text(text.to_string()));
    }
}

/// Split `text` into text and attachment-reference tokens.
///
/// Never fails. An unterminated tag turns the rest of the input into text;
/// a tag whose contents are not a UUID stays in the output as literal text.
/// Adjacent text tokens are always merged.
#[must_use]
pub fn tokenize(text: &str, tags: &AttachmentTags) -> Vec<AttachmentToken> {
    if text.is_empty() {
        return Vec::new();
    }
    if !tags.contains_any(text) {
        return vec![AttachmentToken::Text(text.to_string())];
    }

    let mut tokens = Vec::with_capacity(4);
    let mut cursor = 0usize;
    while cursor < text.len() {
        let rest = &text[cursor..];
        let Some((rel, kind)) = tags.next_start(rest) else {
            push_text(&mut tokens, rest);
            break;
        };
        push_text(&mut tokens, &rest[..rel]);

        let tag_start = cursor + rel;
        let content_start = tag_start + tags.start(kind).len();
        let end_marker = tags.end(kind);
        let Some(end_rel) = text[content_start..].find(end_marker) else {
            push_text(&mut tokens, &text[tag_start..]);
            break;
        };
        let content_end = content_start + end_rel;
        let tag_end = content_end + end_marker.len();

        match Uuid::parse_str(text[content_start..content_end].trim()) {
            Ok(id) => tokens.push(match kind {
                TagKind::Image => AttachmentToken::Image(id),
                TagKind::File => AttachmentToken::File(id),
            }),
            Err(_) => push_text(&mut tokens, &text[tag_start..tag_end]),
        }
        cursor = tag_end;
    }
    tokens
}
