//! Character-offset helpers.
//!
//! Segment offsets count Unicode scalar values, not bytes, so every slice or
//! search over document text goes through these functions.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Slices `text` by character offsets `[start, end)`, clamping both ends to the text.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let end = end.max(start);
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let byte_start = indices.by_ref().nth(start).unwrap_or(text.len());
    let byte_end = if end == start {
        byte_start
    } else {
        indices.nth(end - start - 1).unwrap_or(text.len())
    };
    &text[byte_start..byte_end]
}

/// Every occurrence of `needle` in `haystack` as `(start, end)` character offsets.
///
/// Occurrences may overlap: the search resumes one character after each hit.
/// An empty needle has no occurrences.
pub fn find_all(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }

    let needle_len = char_len(needle);
    let mut occurrences = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;

    while let Some(found) = haystack[byte_pos..].find(needle) {
        let start_byte = byte_pos + found;
        let start = char_pos + char_len(&haystack[byte_pos..start_byte]);
        occurrences.push((start, start + needle_len));

        let step = haystack[start_byte..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        byte_pos = start_byte + step;
        char_pos = start + 1;
    }

    occurrences
}
