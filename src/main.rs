use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boorugrab::browser::ChromiumEngine;
use boorugrab::config::Config;
use boorugrab::crawler::Crawler;

#[derive(Parser)]
#[command(
    name = "boorugrab",
    version,
    about = "Download Danbooru images together with their tags",
    long_about = None
)]
struct Cli {
    /// Post URL (`/posts/<id>`) or gallery URL to download from
    url: String,

    /// Browser profile directory (a temporary one is used if omitted)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Directory to write images and tag files to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Maximum gallery pages to visit (0 = unlimited)
    #[arg(long)]
    max_pages: Option<u32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };

        if let Some(profile) = &self.profile {
            config.browser.profile_dir = Some(profile.clone());
        }
        if let Some(output) = &self.output {
            config.download.output_dir = output.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = max_pages;
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(
        url = %cli.url,
        output = %config.download.output_dir.display(),
        headless = config.browser.headless,
        "boorugrab starting"
    );

    let engine = Arc::new(ChromiumEngine::from_config(&config.browser));
    let crawler = Crawler::new(config, engine).context("Failed to create crawler")?;

    let result = tokio::select! {
        result = crawler.run(&cli.url) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Err(e) = crawler.shutdown().await {
        tracing::warn!(error = %e, "Browser shutdown failed");
    }

    match result {
        None => {
            tracing::warn!("Interrupted, browser closed");
            anyhow::bail!("Interrupted");
        }
        Some(Ok(report)) => {
            tracing::info!(
                saved = report.saved,
                skipped = report.skipped,
                failed = report.failed,
                "boorugrab completed successfully"
            );
            Ok(())
        }
        Some(Err(e)) => {
            tracing::error!(url = %cli.url, error = %e, category = e.category().as_str(), "Crawl failed");
            Err(e).with_context(|| format!("Failed to crawl {}", cli.url))
        }
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("boorugrab=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("boorugrab={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
