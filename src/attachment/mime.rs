//! Magic-byte MIME sniffing with a file-extension fallback.

const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_MAGIC: &[u8] = b"GIF8";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_MAGIC: &[u8] = b"WEBP";

/// Used when neither the bytes nor the file name say what an image is.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Detect a MIME type from leading magic bytes.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PDF_MAGIC) {
        Some("application/pdf")
    } else if bytes.starts_with(PNG_MAGIC) {
        Some("image/png")
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some("image/jpeg")
    } else if bytes.starts_with(GIF_MAGIC) {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(RIFF_MAGIC) && &bytes[8..12] == WEBP_MAGIC {
        Some("image/webp")
    } else {
        None
    }
}

/// Look up a MIME type from a file name's extension.
#[must_use]
pub fn from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "csv" => Some("text/csv"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// Best-effort MIME type: magic bytes, then extension, then `None`.
#[must_use]
pub fn detect(bytes: &[u8], file_name: Option<&str>) -> Option<&'static str> {
    sniff(bytes).or_else(|| file_name.and_then(from_extension))
}

/// MIME type for an image data URI, defaulting to [`DEFAULT_IMAGE_MIME`].
#[must_use]
pub fn image_mime(bytes: &[u8], file_name: Option<&str>) -> &'static str {
    detect(bytes, file_name).unwrap_or(DEFAULT_IMAGE_MIME)
}
