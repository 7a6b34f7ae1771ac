use std::future::Future;

use base64::Engine as _;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::mime;
use super::tags::AttachmentTags;
use super::tokenizer::{tokenize, AttachmentToken};
use crate::config::{AttachmentConfig, ProviderConfig, ProviderKind};
use crate::util::human_file_size;

/// Raw image bytes as stored by the attachment store.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Bytes,
    /// Original file name, used for MIME lookup when sniffing fails.
    pub file_name: Option<String>,
}

/// Storage collaborator that resolves attachment references.
///
/// `None` means "not found" and is never an error. Implementations must be
/// callable from a background task.
pub trait AttachmentLoader: Send + Sync {
    fn load_image(&self, id: Uuid) -> impl Future<Output = Option<ImageData>> + Send;
    fn load_file_text(&self, id: Uuid) -> impl Future<Output = Option<String>> + Send;
}

/// Target payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionFormat {
    /// One string; images become descriptive placeholders.
    InlineText,
    /// Chat-completion content-part array with base64 image parts.
    ContentParts,
}

impl ExpansionFormat {
    /// Capability matrix: which payload shape a provider accepts.
    ///
    /// `accepts_images` overrides the per-kind default.
    #[must_use]
    pub fn for_provider(kind: ProviderKind, accepts_images: Option<bool>) -> Self {
        let multimodal = accepts_images.unwrap_or(match kind {
            ProviderKind::OpenAi | ProviderKind::Aggregator => true,
            ProviderKind::Anthropic | ProviderKind::Local => false,
        });
        if multimodal {
            ExpansionFormat::ContentParts
        } else {
            ExpansionFormat::InlineText
        }
    }

    #[must_use]
    pub fn for_provider_config(provider: &ProviderConfig) -> Self {
        Self::for_provider(provider.kind, provider.accepts_images)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One element of a multimodal message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// Result of expanding a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Expansion {
    /// The `content` value of a chat-completion message.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Expansion::Text(text) => Value::String(text),
            Expansion::Parts(parts) => {
                serde_json::to_value(parts).unwrap_or_else(|_| Value::Array(Vec::new()))
            }
        }
    }
}

/// Tag delimiters plus the placeholders substituted for unresolved data.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub tags: AttachmentTags,
    pub missing_image_placeholder: String,
    pub missing_file_placeholder: String,
}

impl ExpandOptions {
    #[must_use]
    pub fn from_config(config: &AttachmentConfig) -> Self {
        Self {
            tags: AttachmentTags::from_config(config),
            missing_image_placeholder: config.missing_image_placeholder.clone(),
            missing_file_placeholder: config.missing_file_placeholder.clone(),
        }
    }
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self::from_config(&AttachmentConfig::default())
    }
}

#[inline]
fn has_visible_text(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace())
}

fn image_placeholder_block(image: &ImageData) -> String {
    let mime = mime::image_mime(&image.bytes, image.file_name.as_deref());
    format!(
        "\n\n[Image attachment: {mime}, {}]\n(This endpoint does not accept images, so the image itself was not sent.)\n\n",
        human_file_size(image.bytes.len())
    )
}

fn image_data_uri(image: &ImageData) -> String {
    let mime = mime::image_mime(&image.bytes, image.file_name.as_deref());
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    let mut url = String::with_capacity(mime.len() + encoded.len() + 13);
    url.push_str("data:");
    url.push_str(mime);
    url.push_str(";base64,");
    url.push_str(&encoded);
    url
}

/// Resolve attachment tags in `content` into a provider payload.
///
/// Missing attachments are replaced by the configured placeholders; this
/// never fails and never drops the rest of the message.
pub async fn expand<L: AttachmentLoader>(
    content: &str,
    format: ExpansionFormat,
    loader: &L,
    options: &ExpandOptions,
) -> Expansion {
    let tokens = tokenize(content, &options.tags);
    match format {
        ExpansionFormat::InlineText => {
            Expansion::Text(expand_inline(tokens, loader, options).await)
        }
        ExpansionFormat::ContentParts => {
            Expansion::Parts(expand_parts(tokens, loader, options).await)
        }
    }
}

async fn expand_inline<L: AttachmentLoader>(
    tokens: Vec<AttachmentToken>,
    loader: &L,
    options: &ExpandOptions,
) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            AttachmentToken::Text(text) => {
                if has_visible_text(&text) {
                    out.push_str(&text);
                }
            }
            AttachmentToken::Image(id) => match loader.load_image(id).await {
                Some(image) => out.push_str(&image_placeholder_block(&image)),
                None => {
                    tracing::debug!(%id, "image attachment not found");
                    out.push_str(&options.missing_image_placeholder);
                }
            },
            AttachmentToken::File(id) => match loader.load_file_text(id).await {
                Some(text) => {
                    out.push_str("\n\n");
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
                None => {
                    tracing::debug!(%id, "file attachment not found");
                    out.push_str(&options.missing_file_placeholder);
                }
            },
        }
    }
    out.trim().to_string()
}

async fn expand_parts<L: AttachmentLoader>(
    tokens: Vec<AttachmentToken>,
    loader: &L,
    options: &ExpandOptions,
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            AttachmentToken::Text(text) => {
                if has_visible_text(&text) {
                    parts.push(ContentPart::Text { text });
                }
            }
            AttachmentToken::Image(id) => match loader.load_image(id).await {
                Some(image) => parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_uri(&image),
                    },
                }),
                None => {
                    tracing::debug!(%id, "image attachment not found");
                    parts.push(ContentPart::text(options.missing_image_placeholder.as_str()));
                }
            },
            AttachmentToken::File(id) => match loader.load_file_text(id).await {
                Some(text) => parts.push(ContentPart::Text { text }),
                None => {
                    tracing::debug!(%id, "file attachment not found");
                    parts.push(ContentPart::text(options.missing_file_placeholder.as_str()));
                }
            },
        }
    }
    if parts.is_empty() {
        // Some providers reject a message with zero content parts.
        parts.push(ContentPart::text(options.missing_file_placeholder.as_str()));
    }
    parts
}
