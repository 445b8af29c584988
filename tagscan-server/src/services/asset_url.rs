//! Asset deep-link derivation
//!
//! The URL is keyed by the tag's numeric value, so `"00123"` and `"123"` map to
//! the same asset. Padding is done on the digit string itself; tags too long
//! for any machine integer are carried through exactly.

use tagscan_common::config::DEFAULT_ASSET_URL_TEMPLATE;

/// Width the tag value is zero-padded to
pub const PADDED_WIDTH: usize = 12;

/// Render a digit string's value zero-padded to [`PADDED_WIDTH`]
///
/// Values already wider than the pad width are returned without truncation.
pub fn pad_tag_value(tag: &str) -> String {
    let value = tag.trim_start_matches('0');
    let value = if value.is_empty() { "0" } else { value };
    format!("{:0>width$}", value, width = PADDED_WIDTH)
}

/// Build the deep link using the default template
pub fn build_asset_url(tag: Option<&str>) -> Option<String> {
    build_asset_url_with(DEFAULT_ASSET_URL_TEMPLATE, tag)
}

/// Build the deep link from a `{tag}` template
///
/// `tag` must already be normalized (digits only).
pub fn build_asset_url_with(template: &str, tag: Option<&str>) -> Option<String> {
    let tag = tag?;
    Some(template.replace("{tag}", &pad_tag_value(tag)))
}
