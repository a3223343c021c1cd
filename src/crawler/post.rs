//! Post page extraction
//!
//! A post page shows a possibly downscaled sample of the media. When the
//! "view original" link is present it has to be clicked first; only then
//! does `#image` point at the full-size file. Tags are read from the sidebar
//! in category order (artist, copyright, character, general).

use serde::Deserialize;
use std::time::Duration;

use crate::browser::{BrowserSession, PageGuard};
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::models::{MediaKind, PostExtraction, TagCategory};
use crate::utils::normalize_tag;

/// Primary media element of a post page
pub const MEDIA_SELECTOR: &str = "#image";

/// Link that swaps the sample for the original file
pub const VIEW_ORIGINAL_SELECTOR: &str = "a.image-view-original-link";

/// Reads the media element and the tag sidebar.
///
/// Tag lists come back as one array per category, in [`TagCategory::ALL`] order.
pub const POST_SCRIPT: &str = r#"(() => {
    const el = document.querySelector('#image');
    const names = (cls) => Array.from(
        document.querySelectorAll(`section#tag-list ul.${cls} > li`),
        (li) => li.getAttribute('data-tag-name'),
    ).filter((name) => name !== null);
    return {
        media: el ? { tag: el.tagName.toLowerCase(), src: el.src || '' } : null,
        tags: [
            names('artist-tag-list'),
            names('copyright-tag-list'),
            names('character-tag-list'),
            names('general-tag-list'),
        ],
    };
})()"#;

#[derive(Debug, Deserialize)]
struct RawPost {
    media: Option<RawMedia>,
    #[serde(default)]
    tags: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    tag: String,
    #[serde(default)]
    src: String,
}

impl RawPost {
    fn into_extraction(self, url: &str) -> Result<PostExtraction> {
        let media = self.media.ok_or_else(|| Error::MediaNotFound {
            url: url.to_string(),
        })?;

        let kind = MediaKind::from_tag_name(&media.tag).ok_or_else(|| Error::UnsupportedMedia {
            url: url.to_string(),
            tag: media.tag.clone(),
        })?;

        let tags = self
            .tags
            .iter()
            .take(TagCategory::ALL.len())
            .flatten()
            .map(|name| normalize_tag(name))
            .collect();

        Ok(PostExtraction {
            image_url: media.src,
            tags,
            media: kind,
        })
    }
}

/// Extracts [`PostExtraction`]s from post pages
#[derive(Debug, Clone)]
pub struct PostScraper {
    navigation_timeout: Duration,
    selector_timeout: Duration,
}

impl PostScraper {
    /// Create a scraper with explicit wait bounds
    #[must_use]
    pub fn new(navigation_timeout: Duration, selector_timeout: Duration) -> Self {
        Self {
            navigation_timeout,
            selector_timeout,
        }
    }

    /// Create a scraper from browser settings
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(config.navigation_timeout(), config.selector_timeout())
    }

    /// Open a page in `session` and extract the post at `url`
    pub async fn scrape(&self, session: &BrowserSession, url: &str) -> Result<PostExtraction> {
        let page = session.new_page().await?;
        self.extract(page, url).await
    }

    /// Extract the post at `url` using `page`, closing the page afterwards
    /// whether or not extraction succeeded.
    ///
    /// # Errors
    ///
    /// - [`Error::NavigationTimeout`] if the page or `#image` does not show up in time
    /// - [`Error::MediaNotFound`] if `#image` is gone after the view-original click
    /// - [`Error::UnsupportedMedia`] if `#image` is neither `<img>` nor `<video>`
    pub async fn extract(&self, mut page: PageGuard, url: &str) -> Result<PostExtraction> {
        let result = self.extract_from(&mut page, url).await;
        page.release().await;

        match &result {
            Ok(post) => tracing::debug!(
                url,
                media = ?post.media,
                tags = post.tags.len(),
                "Extracted post"
            ),
            Err(e) => tracing::debug!(url, error = %e, "Post extraction failed"),
        }

        result
    }

    async fn extract_from(&self, page: &mut PageGuard, url: &str) -> Result<PostExtraction> {
        let page = page.page()?;

        page.goto(url, self.navigation_timeout)
            .await
            .map_err(|e| Error::from_wait(e, url, "page load"))?;

        page.wait_for_selector(MEDIA_SELECTOR, self.selector_timeout)
            .await
            .map_err(|e| Error::from_wait(e, url, MEDIA_SELECTOR))?;

        if page.click(VIEW_ORIGINAL_SELECTOR).await? {
            tracing::trace!(url, "Clicked view-original link");
        }

        let raw: RawPost = serde_json::from_value(page.evaluate(POST_SCRIPT).await?)?;
        raw.into_extraction(url)
    }
}
