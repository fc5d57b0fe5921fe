//! Small shared helpers.

/// Truncate `text` to at most `max_chars` characters for log previews,
/// appending an ellipsis when shortened.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        assert_eq!(preview("hello world", 5), "hello...");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 6), "héllo ...");
    }
}
