//! Common test utilities
//!
//! An in-memory browser that serves canned gallery and post documents and
//! counts every launch, page and close.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use boorugrab::browser::{BrowserContext, BrowserEngine, BrowserError, BrowserPage};
use boorugrab::crawler::gallery::{GALLERY_SELECTOR, NEXT_LINK_SCRIPT, POST_LINKS_SCRIPT};
use boorugrab::crawler::post::{MEDIA_SELECTOR, POST_SCRIPT, VIEW_ORIGINAL_SELECTOR};

/// A document the fake browser can load
#[derive(Debug, Clone)]
pub enum Doc {
    Gallery {
        posts: Vec<String>,
        next: Option<String>,
    },
    Post {
        /// Media element, `None` when `#image` is gone after load
        media: Option<FakeMedia>,
        /// Tag names per category: artist, copyright, character, general
        tags: [Vec<String>; 4],
    },
}

#[derive(Debug, Clone)]
pub struct FakeMedia {
    pub tag: String,
    pub sample_src: String,
    /// Source after clicking "view original", if the link exists
    pub original_src: Option<String>,
}

/// Build an `<img>` post with the given general tags
pub fn image_post(src: &str, general: &[&str]) -> Doc {
    Doc::Post {
        media: Some(FakeMedia {
            tag: "img".to_string(),
            sample_src: src.to_string(),
            original_src: None,
        }),
        tags: [
            Vec::new(),
            Vec::new(),
            Vec::new(),
            general.iter().map(|t| t.to_string()).collect(),
        ],
    }
}

/// Build a post whose media element has the given tag name
pub fn media_post(tag: &str, src: &str) -> Doc {
    Doc::Post {
        media: Some(FakeMedia {
            tag: tag.to_string(),
            sample_src: src.to_string(),
            original_src: None,
        }),
        tags: Default::default(),
    }
}

/// Build a gallery page
pub fn gallery(posts: &[&str], next: Option<&str>) -> Doc {
    Doc::Gallery {
        posts: posts.iter().map(|p| p.to_string()).collect(),
        next: next.map(str::to_string),
    }
}

/// Counters shared by the engine and everything it creates
#[derive(Debug, Default)]
pub struct Stats {
    pub launch_attempts: AtomicUsize,
    pub launches: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub visits: Mutex<Vec<String>>,
    pub profile_dirs: Mutex<Vec<PathBuf>>,
}

impl Stats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn profile_dirs(&self) -> Vec<PathBuf> {
        self.profile_dirs.lock().unwrap().clone()
    }
}

/// In-memory browser engine
pub struct FakeEngine {
    docs: Arc<HashMap<String, Doc>>,
    pub stats: Arc<Stats>,
    failing_launches: AtomicUsize,
    launch_delay: Duration,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(HashMap::new()),
            stats: Arc::new(Stats::default()),
            failing_launches: AtomicUsize::new(0),
            launch_delay: Duration::ZERO,
        }
    }

    /// Serve `doc` at `url`
    pub fn with_doc(mut self, url: &str, doc: Doc) -> Self {
        Arc::make_mut(&mut self.docs).insert(url.to_string(), doc);
        self
    }

    /// Make the next `n` launches fail
    pub fn failing_launches(self, n: usize) -> Self {
        self.failing_launches.store(n, Ordering::SeqCst);
        self
    }

    /// Make every launch take `delay`
    pub fn launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(&self, profile_dir: &Path) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        self.stats.launch_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }

        let should_fail = self
            .failing_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(BrowserError::Launch("profile is locked".to_string()));
        }

        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        self.stats
            .profile_dirs
            .lock()
            .unwrap()
            .push(profile_dir.to_path_buf());

        Ok(Arc::new(FakeContext {
            docs: Arc::clone(&self.docs),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeContext {
    docs: Arc<HashMap<String, Doc>>,
    stats: Arc<Stats>,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            docs: Arc::clone(&self.docs),
            stats: Arc::clone(&self.stats),
            current: None,
            original_shown: false,
            closed: false,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.stats.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    docs: Arc<HashMap<String, Doc>>,
    stats: Arc<Stats>,
    current: Option<Doc>,
    original_shown: bool,
    closed: bool,
}

impl FakePage {
    fn doc(&self) -> Result<&Doc, BrowserError> {
        self.current
            .as_ref()
            .ok_or_else(|| BrowserError::Page("nothing loaded".to_string()))
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.stats.visits.lock().unwrap().push(url.to_string());
        self.original_shown = false;
        self.current = Some(
            self.docs
                .get(url)
                .cloned()
                .ok_or_else(|| BrowserError::Navigation(format!("404 {url}")))?,
        );
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let found = match self.doc()? {
            Doc::Gallery { .. } => selector == GALLERY_SELECTOR,
            Doc::Post { .. } => selector == MEDIA_SELECTOR,
        };

        if found {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                operation: format!("selector {selector}"),
                after: timeout,
            })
        }
    }

    async fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let has_original = matches!(
            self.doc()?,
            Doc::Post { media: Some(FakeMedia { original_src: Some(_), .. }), .. }
        );

        if selector == VIEW_ORIGINAL_SELECTOR && has_original {
            self.original_shown = true;
            return Ok(true);
        }
        Ok(false)
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        match self.doc()? {
            Doc::Gallery { posts, .. } if script == POST_LINKS_SCRIPT => Ok(json!({ "posts": posts })),
            Doc::Gallery { next, .. } if script == NEXT_LINK_SCRIPT => Ok(json!({ "next": next })),
            Doc::Post { media, tags } if script == POST_SCRIPT => {
                // The original is still downloading after the click, so
                // `currentSrc` keeps naming the sample while `src` already
                // points at the original.
                let reads_current_src = script.contains("currentSrc");
                let media = media.as_ref().map(|m| {
                    let src = match (&m.original_src, self.original_shown) {
                        (Some(original), true) if !reads_current_src => original,
                        _ => &m.sample_src,
                    };
                    json!({ "tag": m.tag, "src": src })
                });
                Ok(json!({ "media": media, "tags": tags }))
            }
            _ => Err(BrowserError::Evaluation("script does not apply to this page".to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Wait until `condition` holds, giving spawned tasks a chance to run
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
