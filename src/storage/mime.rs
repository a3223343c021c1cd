//! Content type to file extension mapping

use mime::Mime;

/// Extensions used in preference to whatever `mime_guess` lists first
const PREFERRED: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
    ("image/bmp", "bmp"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tiff"),
    ("image/x-icon", "ico"),
    ("image/vnd.microsoft.icon", "ico"),
    ("image/heic", "heic"),
    ("image/jxl", "jxl"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

/// File extension (without the dot) for a `Content-Type` header value.
///
/// Parameters such as `charset` are ignored and matching is
/// case-insensitive. Returns `None` when the value does not parse or the
/// type has no known extension.
///
/// # Examples
///
/// ```
/// use boorugrab::storage::mime::extension_for;
///
/// assert_eq!(extension_for("image/jpeg"), Some("jpg"));
/// assert_eq!(extension_for("image/png; charset=binary"), Some("png"));
/// assert_eq!(extension_for("application/x-custom"), None);
/// ```
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let parsed: Mime = content_type.trim().parse().ok()?;
    let essence = parsed.essence_str().to_ascii_lowercase();

    if let Some((_, ext)) = PREFERRED.iter().find(|(mime, _)| *mime == essence) {
        return Some(ext);
    }

    mime_guess::get_mime_extensions_str(&essence).and_then(|exts| exts.first().copied())
}
