use memchr::memmem;

use crate::config::AttachmentConfig;

/// Which attachment store a tag points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Image,
    File,
}

/// Inline attachment tag delimiters.
///
/// Persisted message text references attachments as
/// `<start><uuid><end>`, one delimiter pair per [`TagKind`].
#[derive(Debug, Clone)]
pub struct AttachmentTags {
    image_start: String,
    image_end: String,
    file_start: String,
    file_end: String,
    image_start_finder: memmem::Finder<'static>,
    file_start_finder: memmem::Finder<'static>,
}

impl AttachmentTags {
    #[must_use]
    pub fn new(
        image_start: impl Into<String>,
        image_end: impl Into<String>,
        file_start: impl Into<String>,
        file_end: impl Into<String>,
    ) -> Self {
        let image_start = image_start.into();
        let file_start = file_start.into();
        let image_start_finder = memmem::Finder::new(image_start.as_bytes()).into_owned();
        let file_start_finder = memmem::Finder::new(file_start.as_bytes()).into_owned();
        Self {
            image_start,
            image_end: image_end.into(),
            file_start,
            file_end: file_end.into(),
            image_start_finder,
            file_start_finder,
        }
    }

    #[must_use]
    pub fn from_config(config: &AttachmentConfig) -> Self {
        Self::new(
            config.image_tag_start.as_str(),
            config.image_tag_end.as_str(),
            config.file_tag_start.as_str(),
            config.file_tag_end.as_str(),
        )
    }

    #[must_use]
    pub fn start(&self, kind: TagKind) -> &str {
        match kind {
            TagKind::Image => &self.image_start,
            TagKind::File => &self.file_start,
        }
    }

    #[must_use]
    pub fn end(&self, kind: TagKind) -> &str {
        match kind {
            TagKind::Image => &self.image_end,
            TagKind::File => &self.file_end,
        }
    }

    /// Format a tag referencing `id`.
    #[must_use]
    pub fn wrap(&self, kind: TagKind, id: uuid::Uuid) -> String {
        format!("{}{}{}", self.start(kind), id, self.end(kind))
    }

    /// True when `text` contains either start marker.
    #[must_use]
    pub fn contains_any(&self, text: &str) -> bool {
        let bytes = text.as_bytes();
        self.image_start_finder.find(bytes).is_some() || self.file_start_finder.find(bytes).is_some()
    }

    /// Byte offset and kind of the nearest start marker in `text`.
    #[must_use]
    pub fn next_start(&self, text: &str) -> Option<(usize, TagKind)> {
        let bytes = text.as_bytes();
        let image = self.image_start_finder.find(bytes);
        let file = self.file_start_finder.find(bytes);
        match (image, file) {
            (Some(i), Some(f)) if f < i => Some((f, TagKind::File)),
            (Some(i), _) => Some((i, TagKind::Image)),
            (None, Some(f)) => Some((f, TagKind::File)),
            (None, None) => None,
        }
    }
}

impl Default for AttachmentTags {
    fn default() -> Self {
        Self::from_config(&AttachmentConfig::default())
    }
}
