//! Configuration management for boorugrab
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser configuration
    pub browser: BrowserConfig,

    /// Image download configuration
    pub download: DownloadConfig,

    /// Gallery crawl configuration
    pub crawl: CrawlConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Browser-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Persistent profile directory; a temporary one is used when unset
    pub profile_dir: Option<PathBuf>,

    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium binary
    pub chrome_executable: Option<PathBuf>,

    /// Page load timeout in seconds
    pub navigation_timeout_secs: u64,

    /// Element wait timeout in seconds
    pub selector_timeout_secs: u64,
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory for images and tag files
    pub output_dir: PathBuf,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Gallery crawl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum gallery pages to visit (0 = unlimited)
    pub max_pages: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            profile_dir: None,
            headless: false,
            chrome_executable: None,
            navigation_timeout_secs: 60,
            selector_timeout_secs: 30,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            request_timeout_secs: 120,
            user_agent: format!("boorugrab/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl BrowserConfig {
    /// Get navigation timeout as Duration
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Get selector wait timeout as Duration
    #[must_use]
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

impl DownloadConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let profile_dir = std::env::var("BOORUGRAB_PROFILE_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let headless = std::env::var("BOORUGRAB_HEADLESS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.browser.headless);

        let chrome_executable = std::env::var("BOORUGRAB_CHROME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let navigation_timeout_secs = std::env::var("BOORUGRAB_NAVIGATION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.browser.navigation_timeout_secs);

        let selector_timeout_secs = std::env::var("BOORUGRAB_SELECTOR_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.browser.selector_timeout_secs);

        let output_dir = std::env::var("BOORUGRAB_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.download.output_dir);

        let request_timeout_secs = std::env::var("BOORUGRAB_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.download.request_timeout_secs);

        let user_agent =
            std::env::var("BOORUGRAB_USER_AGENT").unwrap_or(defaults.download.user_agent);

        let max_pages = std::env::var("BOORUGRAB_MAX_PAGES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.crawl.max_pages);

        let log_level =
            std::env::var("BOORUGRAB_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("BOORUGRAB_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            browser: BrowserConfig {
                profile_dir,
                headless,
                chrome_executable,
                navigation_timeout_secs,
                selector_timeout_secs,
            },
            download: DownloadConfig {
                output_dir,
                request_timeout_secs,
                user_agent,
            },
            crawl: CrawlConfig { max_pages },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.browser.navigation_timeout_secs == 0 {
            anyhow::bail!("navigation_timeout_secs must be greater than 0");
        }

        if self.browser.selector_timeout_secs == 0 {
            anyhow::bail!("selector_timeout_secs must be greater than 0");
        }

        if self.download.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }
}
