//! String utilities
//!
//! Character-safe truncation used for report previews and table cells.
//! Everything here counts `char`s, never bytes, so multi-byte text
//! (Polish diacritics in region names, for one) is never split.

use std::borrow::Cow;

/// Copy-on-write string type
pub type CowStr<'a> = Cow<'a, str>;

/// Ellipsis appended to truncated previews
pub const ELLIPSIS: &str = "...";

/// Take at most `max_chars` characters.
///
/// Returns the borrowed input untouched when it already fits, along with
/// whether anything was cut.
pub fn take_chars(s: &str, max_chars: usize) -> (CowStr<'_>, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (Cow::Borrowed(&s[..byte_idx]), true),
        None => (Cow::Borrowed(s), false),
    }
}

/// First `max_chars` characters, plus [`ELLIPSIS`] when the text was longer
pub fn preview(s: &str, max_chars: usize) -> CowStr<'_> {
    match take_chars(s, max_chars) {
        (head, true) => Cow::Owned(format!("{}{}", head, ELLIPSIS)),
        (whole, false) => whole,
    }
}

/// Fit text into a fixed-width cell: newlines flattened, ellipsis included
/// in the width budget.
pub fn fit_cell(s: &str, width: usize) -> String {
    let flat = s.replace(['\n', '\r'], " ");
    let len = flat.chars().count();
    if len <= width {
        return flat;
    }
    if width <= ELLIPSIS.len() {
        return flat.chars().take(width).collect();
    }
    let head: String = flat.chars().take(width - ELLIPSIS.len()).collect();
    format!("{}{}", head, ELLIPSIS)
}

/// Character count (not bytes)
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
