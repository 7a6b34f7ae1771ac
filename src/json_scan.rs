#[inline]
pub(crate) fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    let len = bytes.len();
    while i < len {
        match bytes[i] {
            b' ' | b'\n' | b'\r' | b'\t' => i += 1,
            _ => break,
        }
    }
    i
}

#[inline]
pub(crate) fn skip_ws_back(bytes: &[u8], mut end: usize) -> usize {
    while end > 0 {
        match bytes[end - 1] {
            b' ' | b'\n' | b'\r' | b'\t' => end -= 1,
            _ => break,
        }
    }
    end
}

/// Cheap structural check: first non-whitespace byte is `{`/`[` and the last
/// one is the matching `}`/`]`.
///
/// Not a parse: a payload such as `{"a":"}` passes too.
#[inline]
pub(crate) fn looks_like_complete_json(payload: &[u8]) -> bool {
    let start = skip_ws(payload, 0);
    let end = skip_ws_back(payload, payload.len());
    if end <= start + 1 {
        return false;
    }
    matches!(
        (payload[start], payload[end - 1]),
        (b'{', b'}') | (b'[', b']')
    )
}
