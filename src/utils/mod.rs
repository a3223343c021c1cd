//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

use regex::Regex;
use std::sync::OnceLock;

/// Normalize a tag name as stored by the site into its display form.
///
/// Underscores become spaces; applying it twice changes nothing.
pub fn normalize_tag(tag: &str) -> String {
    tag.replace('_', " ")
}

/// Sanitize filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re = INVALID_CHARS
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("Invalid regex pattern"));

    re.replace_all(filename, "_").to_string()
}
