const PLACEHOLDER: &str = " [...]";

/// Collapse whitespace and fit `text` into `width` characters.
///
/// Whole words are kept and the cut is marked with ` [...]`. If not even the first
/// word fits, the text is cut mid-word instead.
pub fn shorten(text: &str, width: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let placeholder_len = PLACEHOLDER.chars().count();
    let budget = width.saturating_sub(placeholder_len);
    if budget == 0 {
        return truncate_chars(PLACEHOLDER.trim_start(), width).to_string();
    }

    let mut kept = String::new();
    let mut kept_len = 0;
    for word in collapsed.split(' ') {
        let word_len = word.chars().count();
        let needed = if kept.is_empty() { word_len } else { word_len + 1 };
        if kept_len + needed > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
        kept_len += needed;
    }

    if kept.is_empty() {
        kept = truncate_chars(&collapsed, budget).to_string();
    }

    let mut shortened = kept.trim_end_matches([',', ';', ':']).to_string();
    shortened.push_str(PLACEHOLDER);
    shortened
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Split `text` into contiguous pieces of at most `size` characters.
pub fn chunk_chars(text: &str, size: usize) -> Vec<&str> {
    if size == 0 || text.is_empty() {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let piece = truncate_chars(rest, size);
        chunks.push(piece);
        rest = &rest[piece.len()..];
    }
    chunks
}
