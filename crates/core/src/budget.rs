/// Appended when the combined context exceeds the configured budget.
pub const TRUNCATION_MARKER: &str = "\n\n[Truncated]";

/// Enforce the context budget. At or under `max_chars` the text passes
/// through unchanged; over it, the text is cut at a hard character count and
/// the truncation marker appended. The cut is deliberately not word or
/// sentence aware.
///
/// The cut leaves room for the marker, so the result is never longer than
/// `max_chars` and a second application is a no-op. Budgets smaller than the
/// marker itself keep whatever head of the marker fits.
pub fn budget(text: &str, max_chars: usize) -> String {
    let length = text.chars().count();
    if length <= max_chars {
        return text.to_string();
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return TRUNCATION_MARKER.chars().take(max_chars).collect();
    }
    let keep = max_chars - marker_chars;
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
