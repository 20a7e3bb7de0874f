use serde_json::Value;

/// Cut `text` to at most `max_bytes` without splitting a character.
pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Short one-line rendering of the first `limit` records of a column.
pub fn preview_records(records: &[Value], limit: usize, max_bytes: usize) -> String {
    let mut shown = records
        .iter()
        .take(limit)
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    if records.len() > limit {
        shown.push_str(&format!(", ... ({} total)", records.len()));
    }
    truncate_string(&shown, max_bytes)
}
