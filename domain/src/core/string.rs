//! Text helpers used when logging and reporting model output.

/// Shorten `s` to at most `max_len` bytes, ending with `...` when cut.
///
/// The cut always lands on a UTF-8 character boundary.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// First non-blank line of `s`, truncated for single-line log output.
pub fn headline(s: &str, max_len: usize) -> String {
    let line = s.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate(line, max_len)
}
