//! Small helpers shared across the pipelines.

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended. Cuts on a character boundary, so
/// multibyte summaries are safe to preview.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}
