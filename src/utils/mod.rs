//! Utility functions and helpers.

pub mod http;
pub mod report;
pub mod url;

/// Collapse runs of whitespace (including non-breaking spaces) into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold typographic apostrophes to `'`.
pub fn normalize_apostrophes(s: &str) -> String {
    s.replace(['\u{2019}', '\u{2018}', '\u{02BC}'], "'")
}
