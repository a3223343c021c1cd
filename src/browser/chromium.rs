//! Chromium implementation of the browser capability
//!
//! Launches Chrome/Chromium over CDP with chromiumoxide. The CDP event
//! handler runs on its own tokio task for the lifetime of the context and is
//! aborted when the context closes.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserContext, BrowserEngine, BrowserError, BrowserPage};
use crate::config::BrowserConfig;

/// How often to poll for an awaited selector
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after which the network is considered idle
const NETWORK_IDLE_MS: u64 = 500;

/// Resource timing entries kept per page while waiting for idle
const RESOURCE_BUFFER_SIZE: u32 = 100_000;

/// Launches Chromium contexts from a profile directory
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    headless: bool,
    executable: Option<PathBuf>,
    request_timeout: Duration,
}

impl ChromiumEngine {
    /// Create an engine from browser settings
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            executable: config.chrome_executable.clone(),
            request_timeout: config.navigation_timeout(),
        }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, profile_dir: &Path) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        tracing::info!(
            profile = %profile_dir.display(),
            headless = self.headless,
            "Launching Chromium"
        );

        let mut builder = CdpConfig::builder()
            .user_data_dir(profile_dir)
            .request_timeout(self.request_timeout)
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if !self.headless {
            builder = builder.with_head();
        }

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser event error");
                }
            }
        });

        Ok(Arc::new(ChromiumContext {
            browser: Mutex::new(browser),
            handler,
        }))
    }
}

/// A running Chromium instance
struct ChromiumContext {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))?;

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        let result = browser
            .close()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()));

        if result.is_ok() {
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "Browser process did not exit cleanly");
            }
        }

        self.handler.abort();
        result.map(|_| ())
    }
}

/// Script that resolves once the page's network has been quiet for
/// [`NETWORK_IDLE_MS`].
///
/// The resource timing buffer holds 250 entries by default and stops
/// growing when full, which would make a busy page look idle, so it is
/// enlarged first.
fn network_idle_script() -> String {
    format!(
        r#"(async () => {{
            performance.setResourceTimingBufferSize({RESOURCE_BUFFER_SIZE});
            const idleMs = {NETWORK_IDLE_MS};
            const interval = 100;
            let last = performance.getEntriesByType('resource').length;
            let stable = 0;
            while (stable < idleMs) {{
                await new Promise(r => setTimeout(r, interval));
                const count = performance.getEntriesByType('resource').length;
                if (document.readyState === 'complete' && count === last) {{
                    stable += interval;
                }} else {{
                    stable = 0;
                }}
                last = count;
            }}
            return {{ resources: last }};
        }})()"#
    )
}

/// A Chromium tab
struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    /// Poll the resource timeline until no new requests have started for
    /// [`NETWORK_IDLE_MS`] and the document has finished loading.
    async fn wait_for_network_idle(&self) -> Result<(), BrowserError> {
        let script = network_idle_script();

        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::Navigation(e.to_string()))?;
            self.wait_for_network_idle().await
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| BrowserError::Timeout {
                operation: format!("navigation to {url}"),
                after: timeout,
            })?
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::Timeout {
                operation: format!("selector {selector}"),
                after: timeout,
            })
    }

    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(false);
        };

        element
            .click()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))?;
        Ok(true)
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;

        result
            .into_value::<serde_json::Value>()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Page(e.to_string()))
    }
}
