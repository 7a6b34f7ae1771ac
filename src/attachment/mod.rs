//! Inline attachment tags: tokenizing message text and expanding tag
//! references into provider request payloads.

pub mod expander;
pub mod mime;
pub mod tags;
pub mod tokenizer;

pub use expander::{
    expand, AttachmentLoader, ContentPart, ExpandOptions, Expansion, ExpansionFormat, ImageData,
    ImageUrl,
};
pub use tags::{AttachmentTags, TagKind};
pub use tokenizer::{tokenize, AttachmentToken};
