//! Terminal display helpers.

use chrono::{DateTime, Utc};

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with one decimal: `0B`, `512.0B`, `1.5KB`.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, SIZE_UNITS[unit])
}

/// `text` cut to `max_chars` characters with `...` appended when cut.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

/// Turn literal `\n`, `\t` and `\r` escapes in agent output into the real characters.
pub fn unescape_display(content: &str) -> String {
    content
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// Agent replies that are JSON objects or arrays are pretty-printed.
pub fn render_reply(content: &str) -> String {
    let content = unescape_display(content);
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            serde_json::to_string_pretty(&value).unwrap_or(content)
        }
        _ => content,
    }
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
