//! Image and tag file persistence
//!
//! Each saved post produces two files in the output directory:
//! `<id>.<ext>` with the original media bytes and `<id>.txt` with the
//! comma-separated tag line.

pub mod mime;

use futures::StreamExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::DownloadConfig;
use crate::crawler::url::post_id;
use crate::error::{Error, Result};
use crate::models::{PostExtraction, SaveOutcome, SkipReason};

use self::mime::extension_for;

/// Downloads post media and writes tag files
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    /// HTTP client
    client: Client,

    /// Directory for images and tag files
    output_dir: PathBuf,
}

impl ImageDownloader {
    /// Create a downloader with a client built from `config`
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self::with_client(client, config.output_dir.clone()))
    }

    /// Create a downloader around an existing client
    pub fn with_client(client: Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save the media and tags of one extracted post.
    ///
    /// Videos are skipped without any request. The image is streamed to a
    /// `.part` file that is renamed once complete, so an interrupted
    /// download never leaves a truncated `<id>.<ext>` behind.
    ///
    /// # Arguments
    ///
    /// * `extraction` - Media URL and tags scraped from the post page
    /// * `post_url` - Post page URL, used for the file id and as `Referer`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if no id can be derived from `post_url`
    /// - [`Error::HttpStatus`] on a non-success response
    /// - [`Error::MissingContentType`] / [`Error::UnknownContentType`] if the
    ///   response type can't be mapped to an extension
    /// - [`Error::Http`] / [`Error::Io`] if the transfer or a write fails
    pub async fn save_image(
        &self,
        extraction: &PostExtraction,
        post_url: &str,
    ) -> Result<SaveOutcome> {
        let id = post_id(post_url)?;

        if extraction.is_video() {
            tracing::info!(id = %id, url = %post_url, "Skipping video");
            return Ok(SaveOutcome::Skipped {
                id,
                reason: SkipReason::Video,
            });
        }

        let response = self
            .client
            .get(&extraction.image_url)
            .header(REFERER, post_url)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: extraction.image_url.clone(),
                status: status.as_u16(),
            });
        }

        let ext = classify(&response, &extraction.image_url)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let image_path = self.output_dir.join(format!("{id}.{ext}"));
        let bytes = write_body(response, &image_path).await?;
        tracing::info!(id = %id, path = %image_path.display(), bytes, "Saved image");

        let tags_path = self.output_dir.join(format!("{id}.txt"));
        tokio::fs::write(&tags_path, extraction.tag_line()).await?;
        tracing::info!(id = %id, path = %tags_path.display(), tags = extraction.tags.len(), "Saved tags");

        Ok(SaveOutcome::Saved {
            id,
            image_path,
            tags_path,
        })
    }
}

/// Map the response's `Content-Type` to a file extension
fn classify(response: &Response, url: &str) -> Result<&'static str> {
    extension_for_header(response.headers().get(CONTENT_TYPE), url)
}

fn extension_for_header(value: Option<&HeaderValue>, url: &str) -> Result<&'static str> {
    let value = value
        .filter(|value| !value.as_bytes().trim_ascii().is_empty())
        .ok_or_else(|| Error::MissingContentType {
            url: url.to_string(),
        })?;

    // Non-ASCII bytes are kept lossily in the error
    let unknown = || Error::UnknownContentType {
        url: url.to_string(),
        content_type: String::from_utf8_lossy(value.as_bytes()).into_owned(),
    };

    let content_type = value.to_str().map_err(|_| unknown())?;
    extension_for(content_type).ok_or_else(unknown)
}

/// Stream the response body into `path` through a temporary `.part` file.
///
/// Returns the number of bytes written.
async fn write_body(response: Response, path: &Path) -> Result<u64> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = match stream_to(response, &part).await {
        Ok(bytes) => tokio::fs::rename(&part, path)
            .await
            .map(|()| bytes)
            .map_err(Error::from),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&part).await {
            tracing::debug!(path = %part.display(), error = %e, "Failed to remove partial file");
        }
    }

    result
}

async fn stream_to(response: Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut total = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(total)
}
