//! boorugrab - Danbooru image and tag downloader
//!
//! Drives a real browser through Danbooru post and gallery pages, saving
//! each post's original image next to a text file with its tags.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`browser`] - Browser capability traits, the Chromium engine and the shared session
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Post extraction, gallery pagination and crawl orchestration
//! - [`storage`] - Image download and tag file persistence
//! - [`models`] - Core data structures and types
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use boorugrab::browser::ChromiumEngine;
//! use boorugrab::config::Config;
//! use boorugrab::crawler::Crawler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let engine = Arc::new(ChromiumEngine::from_config(&config.browser));
//!     let crawler = Crawler::new(config, engine)?;
//!
//!     let report = crawler.run("https://danbooru.donmai.us/posts/12345").await;
//!     crawler.shutdown().await?;
//!     println!("saved {}", report?.saved);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::browser::{BrowserEngine, BrowserSession, ChromiumEngine};
    pub use crate::config::Config;
    pub use crate::crawler::Crawler;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{CrawlReport, PostExtraction, SaveOutcome, SkipReason};
    pub use crate::storage::ImageDownloader;
}

// Direct re-exports for convenience
pub use models::{CrawlReport, MediaKind, PostExtraction, SaveOutcome};
