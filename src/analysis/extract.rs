//! Locating the JSON payload inside free-form model output.
//!
//! Vision models rarely follow "JSON only" instructions perfectly. They wrap
//! the object in markdown fences, prepend a sentence, or append notes. These
//! helpers peel that noise away without trying to repair the JSON itself.

const FENCE: &str = "```";

/// Strip a markdown code fence (```` ```json ... ``` ```` or ```` ``` ... ``` ````).
///
/// Returns the content between the first opening fence and the next closing
/// fence, skipping an optional language tag on the opening line. Without a
/// closing fence everything after the opening fence is returned. Text with no
/// fence is returned as-is. The result is whitespace-trimmed.
pub fn strip_markdown_code_block(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find(FENCE) else {
        return text;
    };

    let body = skip_language_tag(&text[open + FENCE.len()..]);
    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Skip the language tag that may follow an opening fence.
fn skip_language_tag(after_fence: &str) -> &str {
    let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
    let tag = after_fence[..line_end].trim();
    if !tag.is_empty() && tag.chars().all(is_tag_char) {
        return &after_fence[line_end..];
    }

    // Tag glued to the payload on the same line, e.g. ```json{"a":1}```
    let trimmed = after_fence.trim_start();
    trimmed.strip_prefix("json").unwrap_or(trimmed)
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

/// Extract the first balanced `{...}` object from `text`.
///
/// Braces inside double-quoted strings do not count toward nesting, and a
/// backslash-escaped quote does not end a string. Returns `None` when no
/// complete object exists; only the first object is considered, so an
/// unterminated first object is not skipped in favour of a later one.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // All structural characters are ASCII, so byte offsets are char boundaries.
    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            b'}' if start.is_some() => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Run both stages: unwrap fences, then pull out the first object.
pub fn extract_json_payload(raw: &str) -> Option<&str> {
    extract_first_json_object(strip_markdown_code_block(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"bugTitle\": \"T\"}\n```";
        assert_eq!(strip_markdown_code_block(raw), "{\"bugTitle\": \"T\"}");
    }

    #[test]
    fn test_strip_plain_fence_with_prose() {
        let raw = "Here you go:\n```\n{\"a\": 1}\n```\nHope this helps!";
        assert_eq!(strip_markdown_code_block(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_other_language_tag() {
        let raw = "```javascript\n{\"a\": 1}\n```";
        assert_eq!(strip_markdown_code_block(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_tag_glued_to_payload() {
        assert_eq!(strip_markdown_code_block("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_unclosed_fence() {
        let raw = "```json\n{\"a\": 1}\n";
        assert_eq!(strip_markdown_code_block(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_no_fence() {
        assert_eq!(strip_markdown_code_block("  plain text  "), "plain text");
    }

    #[test]
    fn test_extract_simple_object() {
        let raw = r#"{"a": 1}"#;
        assert_eq!(extract_first_json_object(raw), Some(raw));
    }

    #[test]
    fn test_extract_brace_inside_string() {
        let raw = r#"{"a": "contains } brace"}"#;
        assert_eq!(extract_first_json_object(raw), Some(raw));
    }

    #[test]
    fn test_extract_escaped_quote_inside_string() {
        let raw = r#"{"a": "say \"}\" now", "b": {"c": 2}}"#;
        assert_eq!(extract_first_json_object(raw), Some(raw));
    }

    #[test]
    fn test_extract_with_surrounding_noise() {
        let raw = r#"Sure! {"outer": {"inner": [1, 2]}} trailing {"second": true}"#;
        assert_eq!(
            extract_first_json_object(raw),
            Some(r#"{"outer": {"inner": [1, 2]}}"#)
        );
    }

    #[test]
    fn test_extract_ignores_brace_in_quoted_prose() {
        let raw = r#"The label "{placeholder}" is shown. {"a": 1}"#;
        assert_eq!(extract_first_json_object(raw), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_no_brace() {
        assert_eq!(extract_first_json_object("no json here"), None);
        assert_eq!(extract_first_json_object(""), None);
    }

    #[test]
    fn test_extract_unbalanced() {
        assert_eq!(extract_first_json_object(r#"{"a": {"b": 1}"#), None);
    }

    #[test]
    fn test_extract_stray_closing_brace_before_object() {
        assert_eq!(extract_first_json_object("} {\"a\":1}"), Some("{\"a\":1}"));
    }

    #[test]
    fn test_extract_multibyte_text() {
        let raw = "Відповідь: {\"title\": \"Кнопка\"} кінець";
        assert_eq!(extract_first_json_object(raw), Some("{\"title\": \"Кнопка\"}"));
    }

    #[test]
    fn test_extract_json_payload_fenced() {
        let raw = "```json\n{\"bugTitle\":\"T\"}\n```";
        assert_eq!(extract_json_payload(raw), Some("{\"bugTitle\":\"T\"}"));
    }
}
