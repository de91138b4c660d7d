/// Upper bound on a single tool result fed back to the reasoning engine.
pub const MAX_TOOL_OUTPUT: usize = 64 * 1024; // 64KB

/// Truncate tool output if it exceeds `max_bytes`.
/// Truncates at a char boundary and appends a marker showing original vs truncated size.
pub fn truncate_output(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut boundary = max_bytes;
    while !output.is_char_boundary(boundary) {
        boundary -= 1;
    }
    let truncated = &output[..boundary];
    format!(
        "{truncated}\n\n[truncated: {} bytes -> {} bytes]",
        output.len(),
        boundary
    )
}

/// Keep at most `max_chars` characters, without a marker.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_truncation_when_within_limit() {
        let input = "hello world";
        assert_eq!(truncate_output(input, 1024), input);
    }

    #[test]
    fn truncates_at_limit() {
        let input = "a".repeat(1000);
        let result = truncate_output(&input, 100);
        assert!(result.contains("[truncated: 1000 bytes -> 100 bytes]"));
        assert!(result.starts_with("aaaa"));
    }

    #[test]
    fn truncates_at_char_boundary() {
        // 4-byte chars: boundary 10 floors to 8
        let input = "🦀".repeat(100);
        let result = truncate_output(&input, 10);
        assert!(result.contains("[truncated: 400 bytes -> 8 bytes]"));
    }

    #[test]
    fn exact_boundary_no_truncation() {
        let input = "a".repeat(100);
        assert_eq!(truncate_output(&input, 100), input);
    }

    #[test]
    fn chars_counts_characters_not_bytes() {
        let input = "é".repeat(3000);
        let result = truncate_chars(&input, 2000);
        assert_eq!(result.chars().count(), 2000);
    }

    #[test]
    fn chars_short_input_unchanged() {
        assert_eq!(truncate_chars("short", 2000), "short");
        assert_eq!(truncate_chars("", 10), "");
    }
}
