//! Lazily started, shared browser session
//!
//! A [`BrowserSession`] owns at most one live [`BrowserContext`]. The context
//! is launched on first use. Callers that find it already running take a
//! lock-free fast path; everyone else serializes on the lifecycle mutex and
//! re-checks before launching, so concurrent first uses start one browser.
//!
//! ```text
//!  Unstarted ──ensure_ready──▶ Starting ──ok──▶ Ready ──dispose──▶ Disposed
//!      ▲                          │                                   │
//!      └───────── launch error ───┘                                   │
//!                                  Starting ◀──ensure_ready───────────┘
//! ```
//!
//! Using a disposed session starts a fresh context.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tempfile::TempDir;
use tokio::sync::Mutex;

use super::{BrowserContext, BrowserEngine, BrowserError, PageGuard};
use crate::error::{Error, Result};

/// Prefix for ephemeral profile directories
const TEMP_PROFILE_PREFIX: &str = "boorugrab-";

/// Lifecycle state of a [`BrowserSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No context has been launched yet, or the last launch failed
    Unstarted,
    /// A launch is in progress
    Starting,
    /// A context is live
    Ready,
    /// The context was closed by [`BrowserSession::dispose`]
    Disposed,
}

struct Lifecycle {
    temp_profile: Option<TempDir>,
}

/// Single shared browser context, started on demand
pub struct BrowserSession {
    engine: Arc<dyn BrowserEngine>,
    profile_dir: Option<PathBuf>,
    live: RwLock<Option<Arc<dyn BrowserContext>>>,
    /// Written only while `lifecycle` is held
    state: RwLock<SessionState>,
    lifecycle: Mutex<Lifecycle>,
    launches: AtomicUsize,
}

impl BrowserSession {
    /// Create an unstarted session.
    ///
    /// With `profile_dir` set the context persists its profile there;
    /// otherwise a temporary directory is created at launch and removed on
    /// [`dispose`](Self::dispose) or drop.
    pub fn new(engine: Arc<dyn BrowserEngine>, profile_dir: Option<PathBuf>) -> Self {
        Self {
            engine,
            profile_dir,
            live: RwLock::new(None),
            state: RwLock::new(SessionState::Unstarted),
            lifecycle: Mutex::new(Lifecycle {
                temp_profile: None,
            }),
            launches: AtomicUsize::new(0),
        }
    }

    /// Number of contexts this session has launched
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    ///
    /// Does not wait for an in-progress launch, so `Starting` is visible
    /// while the browser comes up.
    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the live context, launching it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the profile directory cannot be prepared
    /// or the browser fails to start. The session stays unstarted so a later
    /// call can retry.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn BrowserContext>> {
        if let Some(context) = self.live_context() {
            return Ok(context);
        }

        let mut lifecycle = self.lifecycle.lock().await;

        // Another caller may have finished launching while we waited
        if let Some(context) = self.live_context() {
            return Ok(context);
        }

        self.set_state(SessionState::Starting);

        let profile_dir = match self.resolve_profile_dir(&mut lifecycle).await {
            Ok(dir) => dir,
            Err(e) => {
                self.set_state(SessionState::Unstarted);
                return Err(Error::Launch(e));
            }
        };

        match self.engine.launch(&profile_dir).await {
            Ok(context) => {
                self.launches.fetch_add(1, Ordering::SeqCst);
                self.set_live(Some(Arc::clone(&context)));
                self.set_state(SessionState::Ready);
                tracing::info!(profile = %profile_dir.display(), "Browser session ready");
                Ok(context)
            }
            Err(e) => {
                self.set_state(SessionState::Unstarted);
                lifecycle.temp_profile = None;
                tracing::error!(profile = %profile_dir.display(), error = %e, "Browser launch failed");
                Err(Error::Launch(e))
            }
        }
    }

    /// Open a new page in the shared context
    pub async fn new_page(&self) -> Result<PageGuard> {
        let context = self.ensure_ready().await?;
        let page = context.new_page().await?;
        Ok(PageGuard::new(page))
    }

    /// Close the live context, if any.
    ///
    /// Liveness is cleared before the context is closed, so callers racing
    /// with disposal launch a new context instead of using the closing one.
    /// Calling this again is a no-op.
    pub async fn dispose(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        let Some(context) = self.set_live(None) else {
            return Ok(());
        };

        self.set_state(SessionState::Disposed);
        let result = context.close().await;
        lifecycle.temp_profile = None;

        match &result {
            Ok(()) => tracing::info!("Browser session disposed"),
            Err(e) => tracing::warn!(error = %e, "Browser context did not close cleanly"),
        }

        result.map_err(Error::from)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn live_context(&self) -> Option<Arc<dyn BrowserContext>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_live(&self, context: Option<Arc<dyn BrowserContext>>) -> Option<Arc<dyn BrowserContext>> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *live, context)
    }

    async fn resolve_profile_dir(
        &self,
        lifecycle: &mut Lifecycle,
    ) -> std::result::Result<PathBuf, BrowserError> {
        if let Some(dir) = &self.profile_dir {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                BrowserError::Launch(format!("profile directory {}: {e}", dir.display()))
            })?;
            return Ok(dir.clone());
        }

        if let Some(temp) = &lifecycle.temp_profile {
            return Ok(temp.path().to_path_buf());
        }

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PROFILE_PREFIX)
            .tempdir()
            .map_err(|e| BrowserError::Launch(format!("temporary profile directory: {e}")))?;
        let path = temp.path().to_path_buf();
        tracing::debug!(profile = %path.display(), "Created temporary browser profile");
        lifecycle.temp_profile = Some(temp);
        Ok(path)
    }

    /// Configured persistent profile directory, if any
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile_dir.as_deref()
    }
}
