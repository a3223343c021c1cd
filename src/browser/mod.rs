//! Headless browser capability
//!
//! The crawler drives a browser through three small async traits so the
//! pipeline never depends on a particular engine:
//!
//! - [`BrowserEngine`] launches a persistent context rooted at a profile directory
//! - [`BrowserContext`] opens pages and shuts the context down
//! - [`BrowserPage`] navigates, waits, clicks and evaluates scripts
//!
//! [`chromium`] provides the production implementation on top of chromiumoxide.
//! [`session::BrowserSession`] owns the single shared context.

pub mod chromium;
pub mod session;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use chromium::ChromiumEngine;
pub use session::{BrowserSession, SessionState};

/// Errors reported by a browser capability implementation
#[derive(Error, Debug)]
pub enum BrowserError {
    /// The browser process or context could not start
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// A bounded wait expired
    #[error("Timed out after {after:?} waiting for {operation}")]
    Timeout { operation: String, after: Duration },

    /// Navigation was rejected or failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Script evaluation failed or returned no value
    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    /// Any other page or context operation failed
    #[error("Page operation failed: {0}")]
    Page(String),
}

/// Launches browser contexts
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch a persistent context whose profile lives in `profile_dir`
    async fn launch(&self, profile_dir: &Path) -> Result<Arc<dyn BrowserContext>, BrowserError>;
}

/// A running browser context shared by every page of a session
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a new blank page (tab)
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Close the context and every page it still owns
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single page (tab) owned by exactly one task at a time
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate to `url` and wait until network activity settles
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until `selector` matches an element in the current document
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    /// Click the first element matching `selector`.
    ///
    /// Returns `false` without error when nothing matches.
    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError>;

    /// Evaluate `script` against the loaded document and return its JSON result
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Close the page
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Owns a page and guarantees it gets closed.
///
/// Call [`PageGuard::release`] on every normal exit path. If the guard is
/// dropped instead (an error unwound past it, or the consumer of a stream
/// holding it stopped polling), the close is scheduled on the current tokio
/// runtime.
pub struct PageGuard {
    page: Option<Box<dyn BrowserPage>>,
}

impl PageGuard {
    /// Wrap a freshly opened page
    pub fn new(page: Box<dyn BrowserPage>) -> Self {
        Self { page: Some(page) }
    }

    /// Borrow the held page
    pub fn page(&mut self) -> Result<&mut (dyn BrowserPage + 'static), BrowserError> {
        self.page
            .as_deref_mut()
            .ok_or_else(|| BrowserError::Page("page already released".to_string()))
    }

    /// Close the page now, logging (not returning) a close failure
    pub async fn release(mut self) {
        if let Some(mut page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!(error = %e, "Failed to close page");
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let Some(mut page) = self.page.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Page dropped without release, closing in background");
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!(error = %e, "Failed to close abandoned page");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Page dropped outside a tokio runtime; it will stay open");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPage {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserPage for CountingPage {
        async fn goto(&mut self, _url: &str, _timeout: Duration) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn wait_for_selector(
            &mut self,
            _selector: &str,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn click(&mut self, _selector: &str) -> Result<bool, BrowserError> {
            Ok(false)
        }

        async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value, BrowserError> {
            Ok(serde_json::Value::Null)
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn guard(closes: &Arc<AtomicUsize>) -> PageGuard {
        PageGuard::new(Box::new(CountingPage {
            closes: Arc::clone(closes),
        }))
    }

    #[tokio::test]
    async fn test_release_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let page = guard(&closes);
        page.release().await;

        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_schedules_close() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(guard(&closes));

        for _ in 0..10 {
            if closes.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_accessible_until_release() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut page = guard(&closes);
        assert!(page.page().is_ok());
        assert!(!page.page().unwrap().click("a").await.unwrap());
        page.release().await;
    }
}
