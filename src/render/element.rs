use serde::Serialize;
use uuid::Uuid;

/// One structured unit of parsed assistant output.
///
/// Elements come out in render order and each one owns a disjoint span of
/// the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessageElement {
    Text(String),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Code {
        code: String,
        language: String,
        indent_level: usize,
    },
    Formula(String),
    Thinking {
        content: String,
        is_expanded: bool,
    },
    ImageRef(Uuid),
    FileRef(Uuid),
}

impl MessageElement {
    /// Short variant name, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MessageElement::Text(_) => "text",
            MessageElement::Table { .. } => "table",
            MessageElement::Code { .. } => "code",
            MessageElement::Formula(_) => "formula",
            MessageElement::Thinking { .. } => "thinking",
            MessageElement::ImageRef(_) => "image_ref",
            MessageElement::FileRef(_) => "file_ref",
        }
    }

    /// The main textual payload, if any. Attachment references have none.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match self {
            MessageElement::Text(text) | MessageElement::Formula(text) => Some(text),
            MessageElement::Code { code, .. } => Some(code),
            MessageElement::Thinking { content, .. } => Some(content),
            MessageElement::Table { .. }
            | MessageElement::ImageRef(_)
            | MessageElement::FileRef(_) => None,
        }
    }
}
