//! Filename sanitization for export files.
//!
//! Product names become part of a file name, so everything outside ASCII
//! alphanumerics, `_`, `-` and the CJK Unified Ideographs block is replaced.

/// Fallback used when nothing of the input survives sanitization.
pub const UNKNOWN_NAME: &str = "unknown";

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Sanitize a product name for use in an export file name.
///
/// Runs of disallowed characters collapse into a single `_`. An input with no
/// allowed characters at all becomes [`UNKNOWN_NAME`].
///
/// ```
/// use like_monitor::utils::filename::sanitize_product_name;
///
/// assert_eq!(sanitize_product_name("点赞 / 100个"), "点赞_100个");
/// assert_eq!(sanitize_product_name("🎉🎉"), "unknown");
/// ```
pub fn sanitize_product_name(input: &str) -> String {
    if !input.chars().any(is_allowed) {
        return UNKNOWN_NAME.to_string();
    }

    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if is_allowed(c) {
            result.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            result.push('_');
            last_was_replacement = true;
        }
    }

    result
}
