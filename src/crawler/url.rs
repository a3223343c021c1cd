//! Post URL recognition and id extraction
//!
//! Post pages live at `/posts/{id}`; anything else is treated as a gallery
//! listing (`/posts?tags=...`, `/pools/...`, favorites and so on).

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::error::{Error, Result};
use crate::utils::sanitize_filename;

fn post_path_pattern() -> &'static Regex {
    static POST_PATH: OnceLock<Regex> = OnceLock::new();
    POST_PATH.get_or_init(|| Regex::new(r"/posts/\d+").expect("Invalid regex pattern"))
}

/// Whether `url` points at a single post page
///
/// # Examples
///
/// ```
/// use boorugrab::crawler::url::is_post_url;
///
/// assert!(is_post_url("https://danbooru.donmai.us/posts/12345"));
/// assert!(!is_post_url("https://danbooru.donmai.us/posts?tags=cat"));
/// ```
pub fn is_post_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => post_path_pattern().is_match(parsed.path()),
        Err(_) => post_path_pattern().is_match(url),
    }
}

/// Derive the output file stem from a post URL: its last non-empty path
/// segment, made safe for use as a file name.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `url` does not parse or has no path
/// segment to use.
///
/// # Examples
///
/// ```
/// use boorugrab::crawler::url::post_id;
///
/// assert_eq!(post_id("https://example.com/posts/12345?q=tag").unwrap(), "12345");
/// assert_eq!(post_id("https://example.com/posts/12345/").unwrap(), "12345");
/// ```
pub fn post_id(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
        .ok_or_else(|| Error::InvalidUrl(format!("{url}: no path segment to name files after")))?;

    Ok(sanitize_filename(segment))
}
