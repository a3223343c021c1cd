//! Integration tests for post page extraction

mod common;

use boorugrab::browser::BrowserSession;
use boorugrab::crawler::post::PostScraper;
use boorugrab::error::Error;
use boorugrab::models::MediaKind;
use common::{media_post, Doc, FakeEngine, FakeMedia};
use std::sync::Arc;
use std::time::Duration;

const POST: &str = "https://danbooru.test/posts/12345";

fn scraper() -> PostScraper {
    PostScraper::new(Duration::from_secs(5), Duration::from_secs(5))
}

fn tags(groups: [&[&str]; 4]) -> [Vec<String>; 4] {
    groups.map(|group| group.iter().map(|t| t.to_string()).collect())
}

/// The view-original click swaps the sample for the full-size image
#[tokio::test]
async fn test_view_original_is_used() {
    let engine = Arc::new(FakeEngine::new().with_doc(
        POST,
        Doc::Post {
            media: Some(FakeMedia {
                tag: "img".to_string(),
                sample_src: "https://cdn.test/sample/12345.jpg".to_string(),
                original_src: Some("https://cdn.test/original/12345.jpg".to_string()),
            }),
            tags: tags([&["some_artist"], &["original"], &[], &["blue_eyes", "solo"]]),
        },
    ));
    let stats = Arc::clone(&engine.stats);
    let session = BrowserSession::new(engine, None);

    let post = scraper().scrape(&session, POST).await.unwrap();

    assert_eq!(post.image_url, "https://cdn.test/original/12345.jpg");
    assert_eq!(post.media, MediaKind::Image);
    assert_eq!(post.tags, vec!["some artist", "original", "blue eyes", "solo"]);
    assert_eq!(stats.pages_opened(), 1);
    assert_eq!(stats.pages_closed(), 1);
}

/// Without a view-original link the displayed source is used
#[tokio::test]
async fn test_sample_used_without_link() {
    let engine = Arc::new(
        FakeEngine::new().with_doc(POST, common::image_post("https://cdn.test/12345.png", &["cat"])),
    );
    let session = BrowserSession::new(engine, None);

    let post = scraper().scrape(&session, POST).await.unwrap();

    assert_eq!(post.image_url, "https://cdn.test/12345.png");
    assert_eq!(post.tags, vec!["cat"]);
}

/// Tags come out artist, copyright, character, general
#[tokio::test]
async fn test_tag_category_order() {
    let engine = Arc::new(FakeEngine::new().with_doc(
        POST,
        Doc::Post {
            media: Some(FakeMedia {
                tag: "img".to_string(),
                sample_src: "https://cdn.test/1.jpg".to_string(),
                original_src: None,
            }),
            tags: tags([&["a"], &["c"], &["ch"], &["g1", "g2"]]),
        },
    ));
    let session = BrowserSession::new(engine, None);

    let post = scraper().scrape(&session, POST).await.unwrap();
    assert_eq!(post.tags, vec!["a", "c", "ch", "g1", "g2"]);
}

/// Video posts are reported as such
#[tokio::test]
async fn test_video_post() {
    let engine =
        Arc::new(FakeEngine::new().with_doc(POST, media_post("video", "https://cdn.test/1.mp4")));
    let session = BrowserSession::new(engine, None);

    let post = scraper().scrape(&session, POST).await.unwrap();
    assert!(post.is_video());
}

/// Media that is neither image nor video is an error, and the page is closed
#[tokio::test]
async fn test_unsupported_media_closes_page() {
    let engine = Arc::new(FakeEngine::new().with_doc(POST, media_post("canvas", "")));
    let stats = Arc::clone(&engine.stats);
    let session = BrowserSession::new(engine, None);

    let result = scraper().scrape(&session, POST).await;

    assert!(matches!(result, Err(Error::UnsupportedMedia { ref tag, .. }) if tag == "canvas"));
    assert_eq!(stats.pages_closed(), 1);
}

/// `#image` vanishing after load is reported as missing media
#[tokio::test]
async fn test_missing_media() {
    let engine = Arc::new(FakeEngine::new().with_doc(
        POST,
        Doc::Post {
            media: None,
            tags: Default::default(),
        },
    ));
    let stats = Arc::clone(&engine.stats);
    let session = BrowserSession::new(engine, None);

    let result = scraper().scrape(&session, POST).await;

    assert!(matches!(result, Err(Error::MediaNotFound { ref url }) if url == POST));
    assert_eq!(stats.pages_closed(), 1);
}

/// A page that never shows `#image` times out
#[tokio::test]
async fn test_media_wait_timeout() {
    let engine = Arc::new(
        FakeEngine::new().with_doc(POST, common::gallery(&["/posts/1"], None)),
    );
    let stats = Arc::clone(&engine.stats);
    let session = BrowserSession::new(engine, None);

    let result = scraper().scrape(&session, POST).await;

    match result {
        Err(Error::NavigationTimeout { url, waiting_for }) => {
            assert_eq!(url, POST);
            assert_eq!(waiting_for, "#image");
        }
        other => panic!("expected navigation timeout, got {other:?}"),
    }
    assert_eq!(stats.pages_closed(), 1);
}

/// Navigation failures other than timeouts keep their browser error
#[tokio::test]
async fn test_navigation_failure() {
    let engine = Arc::new(FakeEngine::new());
    let session = BrowserSession::new(engine, None);

    let result = scraper().scrape(&session, POST).await;
    assert!(matches!(result, Err(Error::Browser(_))));
}
