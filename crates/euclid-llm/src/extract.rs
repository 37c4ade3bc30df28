//! Pull a JSON object out of free-form model output.

/// Return `text` itself when it is valid JSON, otherwise the span from the
/// first `{` to the last `}` if that parses. `None` when neither works.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &trimmed[start..=end];
    serde_json::from_str::<serde_json::Value>(candidate)
        .ok()
        .map(|_| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_text_is_json() {
        assert_eq!(extract_json_block(" {\"a\": 1} "), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let text = "Sure! Here is the plan:\n```json\n{\"solution\": \"x = 2\", \"checks\": []}\n```\nHope it helps.";
        assert_eq!(extract_json_block(text), Some("{\"solution\": \"x = 2\", \"checks\": []}"));
    }

    #[test]
    fn test_broken_json_is_rejected() {
        assert_eq!(extract_json_block("{\"solution\": \"unterminated}"), None);
        assert_eq!(extract_json_block("no braces here"), None);
        assert_eq!(extract_json_block("} backwards {"), None);
        assert_eq!(extract_json_block(""), None);
    }
}
