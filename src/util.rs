const SIZE_UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Human-readable byte count with decimal units, e.g. `512 B`, `12.3 KB`.
#[must_use]
pub(crate) fn human_file_size(bytes: usize) -> String {
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0usize;
    while value >= 999.95 && unit + 1 < SIZE_UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit])
}

/// Byte offset just past the `max_chars`-th character, or `None` when the
/// text is not longer than that.
#[inline]
#[must_use]
pub(crate) fn byte_offset_of_char(text: &str, max_chars: usize) -> Option<usize> {
    text.char_indices().nth(max_chars).map(|(offset, _)| offset)
}
