//! Tolerant extraction of a JSON object from free-form model output.

/// Pull the first plausible JSON object out of raw model text.
///
/// Tries, in order: the text itself when it already starts with `{`, the
/// contents of the first fenced code block, and finally the first balanced
/// `{...}` region found by a brace scan.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    let rest = raw.split('{').nth(1)?;
    let mut depth = 1i32;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let mut candidate = String::from("{");
                    candidate.push_str(&rest[..=idx]);
                    return Some(trim_symmetric(&candidate));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}
