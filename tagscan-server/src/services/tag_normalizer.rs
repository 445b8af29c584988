//! Asset tag normalization
//!
//! Vision model output is untrusted free text. A tag is accepted only when,
//! after trimming whitespace and removing quote characters, what remains is a
//! non-empty run of ASCII digits. Leading zeros are kept.

/// Quote characters models wrap answers in
const QUOTE_CHARS: &[char] = &['"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Normalize raw model output into a digit-only tag
///
/// Returns `None` for anything that is not a digit sequence. This is a normal
/// negative outcome (no tag visible), not an error.
///
/// # Examples
///
/// ```
/// use tagscan_server::services::tag_normalizer::normalize_tag;
///
/// assert_eq!(normalize_tag("  \"00123\"\n"), Some("00123".to_string()));
/// assert_eq!(normalize_tag("Tag: 123"), None);
/// assert_eq!(normalize_tag(""), None);
/// ```
pub fn normalize_tag(raw: &str) -> Option<String> {
    let stripped: String = raw.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    let candidate = stripped.trim();

    if !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit()) {
        Some(candidate.to_string())
    } else {
        None
    }
}
