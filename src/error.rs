//! Unified error handling for the boorugrab crate
//!
//! Every failure the crawl pipeline can produce is a variant of [`Error`].
//! Callers decide how to react through [`Error::category`] and
//! [`Error::skip_reason`]:
//!
//! - a gallery crawl catches errors at the per-post boundary, logs them and
//!   moves on, treating [`Error::UnsupportedMedia`] as a skip;
//! - a single-post run propagates every error to the caller.
//!
//! # Usage
//!
//! ```rust,ignore
//! use boorugrab::error::{Error, ErrorCategory};
//!
//! fn report(err: &Error) {
//!     if let Some(reason) = err.skip_reason() {
//!         tracing::info!(reason = %reason, "Skipped post");
//!     } else if err.category() == ErrorCategory::Browser {
//!         tracing::error!(error = %err, "Browser failure");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::models::SkipReason;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Browser startup, navigation and page errors
    Browser,
    /// Post page did not expose a usable media element
    Extraction,
    /// HTTP download and content classification errors
    Download,
    /// Filesystem errors
    Storage,
    /// Configuration and input validation errors
    Config,
}

impl ErrorCategory {
    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Extraction => "extraction",
            Self::Download => "download",
            Self::Storage => "storage",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the boorugrab crate
#[derive(Error, Debug)]
pub enum Error {
    /// The browser context could not be started
    #[error("Failed to launch browser: {0}")]
    Launch(#[source] BrowserError),

    /// A page did not load, or an awaited element did not appear, in time
    #[error("Timed out waiting for {waiting_for} on {url}")]
    NavigationTimeout { url: String, waiting_for: String },

    /// The post page has no media element after the view-original interaction
    #[error("Can't find image on {url}")]
    MediaNotFound { url: String },

    /// The media element is neither an image nor a video
    #[error("Media element <{tag}> on {url} is not an img or video (maybe animated GIF?)")]
    UnsupportedMedia { url: String, tag: String },

    /// The image response did not declare a content type
    #[error("Can't retrieve Content-Type from {url}")]
    MissingContentType { url: String },

    /// The declared content type has no known file extension
    #[error("Unknown Content-Type: {content_type}")]
    UnknownContentType { url: String, content_type: String },

    /// The image server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// A URL could not be parsed or has no usable post id
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Any other browser capability failure
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// In-page script returned data of an unexpected shape
    #[error("Unexpected page data: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map a browser wait failure on `url` into the matching crate error.
    ///
    /// Timeouts become [`Error::NavigationTimeout`]; everything else is kept
    /// as a plain [`Error::Browser`].
    pub fn from_wait(err: BrowserError, url: &str, waiting_for: &str) -> Self {
        match err {
            BrowserError::Timeout { .. } => Self::NavigationTimeout {
                url: url.to_string(),
                waiting_for: waiting_for.to_string(),
            },
            other => Self::Browser(other),
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Launch(_) | Self::NavigationTimeout { .. } | Self::Browser(_) => {
                ErrorCategory::Browser
            }
            Self::MediaNotFound { .. } | Self::UnsupportedMedia { .. } | Self::Json(_) => {
                ErrorCategory::Extraction
            }
            Self::MissingContentType { .. }
            | Self::UnknownContentType { .. }
            | Self::HttpStatus { .. }
            | Self::Http(_) => ErrorCategory::Download,
            Self::Io(_) => ErrorCategory::Storage,
            Self::InvalidUrl(_) => ErrorCategory::Config,
        }
    }

    /// Why a gallery crawl should report this as a skipped post rather
    /// than a failure, or `None` for a real failure
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::UnsupportedMedia { tag, .. } => Some(SkipReason::UnsupportedMedia(tag.clone())),
            _ => None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
