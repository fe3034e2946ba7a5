const FENCE: &str = "```";

/// Strip Markdown code-fence wrappers from raw model output.
///
/// Trims, removes an opening fence (with its language tag) up to twice, then a
/// single closing fence. Inner content, including newlines, is kept verbatim.
pub fn clean_markdown_fences(raw: &str) -> String {
    let mut cleaned = raw.trim();
    if cleaned.starts_with(FENCE) {
        cleaned = strip_opening_fence(cleaned);
    }
    if cleaned.starts_with(FENCE) {
        cleaned = strip_opening_fence(cleaned);
    }
    if let Some(rest) = cleaned.strip_suffix(FENCE) {
        cleaned = rest;
    }
    cleaned.to_string()
}

fn strip_opening_fence(s: &str) -> &str {
    let rest = &s[FENCE.len()..];
    if let Some(after) = rest.strip_prefix("json") {
        return after;
    }
    // Any other tag counts only when it fills the rest of the fence line.
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.')))
        .unwrap_or(rest.len());
    let after = &rest[tag_len..];
    if tag_len > 0 && (after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n")) {
        after
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fence_keeps_inner_newlines() {
        assert_eq!(
            clean_markdown_fences("```json\n{\"a\":1}\n```"),
            "\n{\"a\":1}\n"
        );
    }

    #[test]
    fn bare_fence() {
        assert_eq!(clean_markdown_fences("```\nhello\n```"), "\nhello\n");
    }

    #[test]
    fn other_language_tags_are_equivalent() {
        assert_eq!(clean_markdown_fences("```kotlin\nval x = 1\n```"), "\nval x = 1\n");
        assert_eq!(clean_markdown_fences("```c++\nint x;\n```"), "\nint x;\n");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_first() {
        assert_eq!(clean_markdown_fences("  \n```json\n[]\n```  \n"), "\n[]\n");
    }

    #[test]
    fn doubled_opening_fence() {
        assert_eq!(clean_markdown_fences("``````json\n{}\n```"), "\n{}\n");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(clean_markdown_fences("  plain reply "), "plain reply");
        assert_eq!(clean_markdown_fences(""), "");
    }

    #[test]
    fn inline_code_is_not_mistaken_for_a_tag() {
        assert_eq!(clean_markdown_fences("```hello world```"), "hello world");
    }

    #[test]
    fn trailing_fence_only() {
        assert_eq!(clean_markdown_fences("{}\n```"), "{}\n");
        assert_eq!(clean_markdown_fences("```"), "");
    }
}
