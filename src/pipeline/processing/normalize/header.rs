use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::UNNAMED_COLUMN;

static DELIMITER_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("delimiter pattern is valid"));

/// Canonical form of a column header: trimmed, lower-cased, every run of
/// whitespace or punctuation collapsed to a single `_`.
///
/// `"  Deal Value ($) "` becomes `"deal_value"`. The result contains only
/// lower-case letters, digits and single inner underscores, so applying the
/// function again is a no-op.
pub fn normalize_header(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM
    let name = name.trim().trim_start_matches('\u{feff}').to_lowercase();
    let collapsed = DELIMITER_RUN.replace_all(&name, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        UNNAMED_COLUMN.to_string()
    } else {
        trimmed.to_string()
    }
}
