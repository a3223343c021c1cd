//! Gallery page walker with pagination support
//!
//! Walks a listing page by page, yielding post URLs as they are found.
//! The walk is lazy: a page is only loaded once every post URL of the
//! previous page has been pulled from the stream.

use async_stream::try_stream;
use futures::Stream;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::browser::{BrowserSession, PageGuard};
use crate::config::Config;
use crate::error::{Error, Result};

/// Container that marks a rendered gallery page
pub const GALLERY_SELECTOR: &str = "div.post-gallery";

/// Collects post links of the current gallery page in document order
pub const POST_LINKS_SCRIPT: &str = r#"(() => ({
    posts: Array.from(
        document.querySelectorAll('div.post-gallery article.post-preview a.post-preview-link'),
        (a) => a.href,
    ),
}))()"#;

/// Reads the "next page" link of the current gallery page
pub const NEXT_LINK_SCRIPT: &str = r#"(() => {
    const next = document.querySelector('div.post-gallery a.paginator-next');
    return { next: next ? next.href : null };
})()"#;

#[derive(Debug, Deserialize)]
struct PostLinks {
    #[serde(default)]
    posts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NextLink {
    next: Option<String>,
}

/// Walks gallery pages of one shared browser session
#[derive(Clone, Copy)]
pub struct GalleryWalker<'a> {
    session: &'a BrowserSession,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    max_pages: u32,
}

impl<'a> GalleryWalker<'a> {
    /// Create a walker
    ///
    /// # Arguments
    ///
    /// * `session` - Browser session to open the walk's page in
    /// * `navigation_timeout` - Bound on each page load
    /// * `selector_timeout` - Bound on waiting for the gallery container
    /// * `max_pages` - Maximum pages to visit (0 = unlimited)
    #[must_use]
    pub fn new(
        session: &'a BrowserSession,
        navigation_timeout: Duration,
        selector_timeout: Duration,
        max_pages: u32,
    ) -> Self {
        Self {
            session,
            navigation_timeout,
            selector_timeout,
            max_pages,
        }
    }

    /// Create a walker from the crawl configuration
    #[must_use]
    pub fn from_config(session: &'a BrowserSession, config: &Config) -> Self {
        Self::new(
            session,
            config.browser.navigation_timeout(),
            config.browser.selector_timeout(),
            config.crawl.max_pages,
        )
    }

    /// Stream every post URL reachable from `start_url` by following
    /// "next page" links.
    ///
    /// The stream ends when a page has no next link, when the next link
    /// points at a page already visited, or after `max_pages` pages. It
    /// ends with an error if a page fails to load. One browser page is used
    /// for the whole walk and is closed when the stream finishes or is
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use boorugrab::browser::BrowserSession;
    /// # use boorugrab::crawler::gallery::GalleryWalker;
    /// # use futures::{pin_mut, StreamExt};
    /// # use std::time::Duration;
    /// # async fn example(session: &BrowserSession) -> boorugrab::error::Result<()> {
    /// let walker = GalleryWalker::new(session, Duration::from_secs(60), Duration::from_secs(30), 0);
    /// let posts = walker.walk("https://danbooru.donmai.us/posts?tags=cat");
    /// pin_mut!(posts);
    ///
    /// while let Some(url) = posts.next().await {
    ///     println!("{}", url?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn walk(&self, start_url: &str) -> impl Stream<Item = Result<String>> + 'a {
        let walker = *self;
        let start_url = start_url.to_string();

        try_stream! {
            let mut page = walker.session.new_page().await?;
            let mut visited = HashSet::new();
            let mut cursor = Some(start_url);
            let mut pages = 0u32;
            let mut failure = None;

            while let Some(url) = cursor.take() {
                if !visited.insert(url.clone()) {
                    tracing::warn!(url = %url, "Next page link points at a visited page, stopping");
                    break;
                }

                if walker.max_pages > 0 && pages >= walker.max_pages {
                    tracing::debug!(pages, max_pages = walker.max_pages, "Reached maximum pages limit");
                    break;
                }
                pages += 1;

                let posts = match walker.load_posts(&mut page, &url).await {
                    Ok(posts) => posts,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                };

                tracing::debug!(url = %url, page = pages, posts = posts.len(), "Processed gallery page");

                for post in posts {
                    yield post;
                }

                match walker.next_link(&mut page).await {
                    Ok(next) => cursor = next,
                    Err(e) => failure = Some(e),
                }
            }

            page.release().await;

            if let Some(e) = failure {
                tracing::debug!(pages, error = %e, "Gallery walk failed");
                Err::<(), Error>(e)?;
            }

            tracing::info!(pages, "Gallery walk finished");
        }
    }

    async fn load_posts(&self, page: &mut PageGuard, url: &str) -> Result<Vec<String>> {
        let page = page.page()?;

        page.goto(url, self.navigation_timeout)
            .await
            .map_err(|e| Error::from_wait(e, url, "gallery page load"))?;

        page.wait_for_selector(GALLERY_SELECTOR, self.selector_timeout)
            .await
            .map_err(|e| Error::from_wait(e, url, GALLERY_SELECTOR))?;

        let links: PostLinks = serde_json::from_value(page.evaluate(POST_LINKS_SCRIPT).await?)?;
        Ok(links.posts)
    }

    async fn next_link(&self, page: &mut PageGuard) -> Result<Option<String>> {
        let page = page.page()?;
        let link: NextLink = serde_json::from_value(page.evaluate(NEXT_LINK_SCRIPT).await?)?;
        Ok(link.next.filter(|next| !next.is_empty()))
    }
}
