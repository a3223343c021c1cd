//! Crawl orchestration
//!
//! This module ties the browser session, post extraction and image
//! downloads together. A post URL is saved directly; any other URL is
//! treated as a gallery and every post on every page is saved in order.

pub mod gallery;
pub mod post;
pub mod url;

use futures::{pin_mut, StreamExt};
use std::sync::Arc;

use crate::browser::{BrowserEngine, BrowserSession};
use crate::config::Config;
use crate::error::Result;
use crate::models::{CrawlReport, SaveOutcome};
use crate::storage::ImageDownloader;

use self::gallery::GalleryWalker;
use self::post::PostScraper;
use self::url::{is_post_url, post_id};

/// Main crawler structure
pub struct Crawler {
    /// Shared browser context, started on first use
    session: BrowserSession,

    /// Post page extraction
    scraper: PostScraper,

    /// Image and tag persistence
    downloader: ImageDownloader,

    /// Configuration
    config: Config,
}

impl Crawler {
    /// Create a new crawler instance
    ///
    /// The browser is not started until the first page is needed.
    pub fn new(config: Config, engine: Arc<dyn BrowserEngine>) -> Result<Self> {
        let downloader = ImageDownloader::new(&config.download)?;
        Ok(Self::with_downloader(config, engine, downloader))
    }

    /// Create a crawler around an already built downloader
    pub fn with_downloader(
        config: Config,
        engine: Arc<dyn BrowserEngine>,
        downloader: ImageDownloader,
    ) -> Self {
        let session = BrowserSession::new(engine, config.browser.profile_dir.clone());
        let scraper = PostScraper::from_config(&config.browser);

        Self {
            session,
            scraper,
            downloader,
            config,
        }
    }

    /// Browser session used by this crawler
    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Save the post at `url`, or every post of the gallery at `url`
    pub async fn run(&self, url: &str) -> Result<CrawlReport> {
        if is_post_url(url) {
            tracing::info!(url = %url, "Crawling single post");
            let mut report = CrawlReport::new();
            let outcome = self.crawl_post(url).await?;
            report.record(&outcome);
            Ok(report)
        } else {
            tracing::info!(url = %url, "Crawling gallery");
            self.crawl_gallery(url).await
        }
    }

    /// Save one post. Every failure, including unsupported media, is returned.
    pub async fn crawl_post(&self, url: &str) -> Result<SaveOutcome> {
        self.save_post(url).await
    }

    /// Save every post reachable from the gallery at `url`.
    ///
    /// Per-post failures are logged and counted in the report; a failure to
    /// load a gallery page ends the crawl with that error.
    pub async fn crawl_gallery(&self, url: &str) -> Result<CrawlReport> {
        let walker = GalleryWalker::from_config(&self.session, &self.config);
        let posts = walker.walk(url);
        pin_mut!(posts);

        let mut report = CrawlReport::new();

        while let Some(post_url) = posts.next().await {
            let post_url = post_url?;

            match self.save_post(&post_url).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => match e.skip_reason() {
                    Some(reason) => {
                        tracing::info!(url = %post_url, reason = %reason, "Skipping post");
                        let id = post_id(&post_url).unwrap_or_else(|_| post_url.clone());
                        report.record(&SaveOutcome::Skipped { id, reason });
                    }
                    None => {
                        tracing::warn!(
                            url = %post_url,
                            error = %e,
                            category = e.category().as_str(),
                            "Can't save image"
                        );
                        report.record_failure(post_url);
                    }
                },
            }
        }

        tracing::info!(
            saved = report.saved,
            skipped = report.skipped,
            failed = report.failed,
            "Gallery crawl completed"
        );

        Ok(report)
    }

    async fn save_post(&self, url: &str) -> Result<SaveOutcome> {
        let extraction = self.scraper.scrape(&self.session, url).await?;
        self.downloader.save_image(&extraction, url).await
    }

    /// Close the browser and remove its temporary profile
    pub async fn shutdown(&self) -> Result<()> {
        self.session.dispose().await
    }
}
