// Core data structures for boorugrab

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of media element a post page resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify an element by its (case-insensitive) tag name
    pub fn from_tag_name(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "img" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Tag groups shown on a post page, in the order they are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Artist,
    Copyright,
    Character,
    General,
}

impl TagCategory {
    /// All categories in collection order
    pub const ALL: [TagCategory; 4] = [
        Self::Artist,
        Self::Copyright,
        Self::Character,
        Self::General,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Copyright => "copyright",
            Self::Character => "character",
            Self::General => "general",
        }
    }

    /// CSS class of the category's `<ul>` in the tag sidebar
    pub fn list_class(&self) -> &'static str {
        match self {
            Self::Artist => "artist-tag-list",
            Self::Copyright => "copyright-tag-list",
            Self::Character => "character-tag-list",
            Self::General => "general-tag-list",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of scraping one post page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostExtraction {
    /// Absolute URL of the full-size media
    pub image_url: String,
    /// Normalized tags, artist first and general last
    pub tags: Vec<String>,
    /// Whether the media element is an `<img>` or a `<video>`
    pub media: MediaKind,
}

impl PostExtraction {
    /// Whether the post is a video, which is never downloaded
    pub fn is_video(&self) -> bool {
        self.media == MediaKind::Video
    }

    /// Tags as written to the sidecar file
    pub fn tag_line(&self) -> String {
        self.tags.join(", ")
    }
}

/// Why a post produced no files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The post is a video
    Video,
    /// The media element is not something we can save
    UnsupportedMedia(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::UnsupportedMedia(tag) => write!(f, "unsupported <{tag}> element"),
        }
    }
}

/// Outcome of saving one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Image and tag file were written
    Saved {
        id: String,
        image_path: PathBuf,
        tags_path: PathBuf,
    },
    /// Nothing was written
    Skipped { id: String, reason: SkipReason },
}

impl SaveOutcome {
    /// Post id the outcome refers to
    pub fn id(&self) -> &str {
        match self {
            Self::Saved { id, .. } | Self::Skipped { id, .. } => id,
        }
    }
}

/// Totals for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Post URLs whose extraction or download failed
    pub failed_urls: Vec<String>,
}

impl CrawlReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished post
    pub fn record(&mut self, outcome: &SaveOutcome) {
        match outcome {
            SaveOutcome::Saved { .. } => self.saved += 1,
            SaveOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Count a failed post
    pub fn record_failure(&mut self, url: impl Into<String>) {
        self.failed += 1;
        self.failed_urls.push(url.into());
    }

    /// Total posts seen
    pub fn total(&self) -> usize {
        self.saved + self.skipped + self.failed
    }
}
