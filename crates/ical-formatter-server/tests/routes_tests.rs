//! In-process tests for the HTTP routes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ical_formatter::{FormatterConfig, Profile, ProfileRegistry};
use ical_formatter_server::{router, AppState, FetchError, SourceCache, SourceFetcher};
use tower::ServiceExt;

const FEED_URL: &str = "https://timetable.example.edu/feed.ics";

const FEED: &str = "BEGIN:VCALENDAR\r\n\
PRODID:-//Uni//Timetable//EN\r\n\
BEGIN:VEVENT\r\n\
UID:COMP1511-LEC-01@uni.example\r\n\
DTSTART:20260105T090000Z\r\n\
SUMMARY:COMP1511 Lecture (A01)\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:COMP1511-LEC-02@uni.example\r\n\
DTSTART:20260112T090000Z\r\n\
SUMMARY:COMP1511 Lecture (A01)\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

/// Serves canned bodies and counts how often it was asked.
#[derive(Default)]
struct MemoryFetcher {
    bodies: HashMap<String, String>,
    calls: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

impl SourceFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn registry() -> ProfileRegistry {
    let mut registry = ProfileRegistry::builtin();
    registry.insert(
        "feed",
        Profile {
            source: Some(FEED_URL.to_string()),
            formatter: FormatterConfig {
                replace_product_id: Some("-//Served//EN".to_string()),
                ..FormatterConfig::default()
            },
            extension_file: None,
        },
    );
    registry.insert(
        "strict",
        Profile {
            source: Some(FEED_URL.to_string()),
            formatter: FormatterConfig::from_json(
                r#"{ "uidFixup": { "prefix": { "type": "literal", "value": "x-" } } }"#,
            )
            .unwrap(),
            extension_file: None,
        },
    );
    registry
}

fn app(fetcher: MemoryFetcher, verbose_errors: bool) -> Router {
    let cache = SourceCache::new(Duration::from_secs(300), 16);
    router(AppState::new(registry(), fetcher, cache, verbose_errors))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let (status, _, body) = get(app(MemoryFetcher::default(), false), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn serves_profile_source() {
    let fetcher = MemoryFetcher::default().with(FEED_URL, FEED);
    let (status, content_type, body) = get(app(fetcher, false), "/calendars/feed").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/calendar; charset=utf-8"));
    assert!(body.contains("PRODID:-//Served//EN\r\n"));
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 2);
}

#[tokio::test]
async fn query_url_serves_profiles_without_source() {
    let url = "https://other.example/cal.ics";
    let fetcher = MemoryFetcher::default().with(url, FEED);
    let (status, _, body) = get(app(fetcher, false), &format!("/calendars/timetable?url={url}")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("RRULE:FREQ=WEEKLY;COUNT=2;BYDAY=MO"));
    assert!(body.contains("SUMMARY:COMP1511 Lecture\r\n"));
}

#[tokio::test]
async fn source_is_fetched_once_and_reparsed() {
    let fetcher = MemoryFetcher::default().with(FEED_URL, FEED);
    let calls = Arc::clone(&fetcher.calls);
    let app = app(fetcher, false);

    let (first, _, _) = get(app.clone(), "/calendars/feed").await;
    // Same source, different profile: the cached raw text is transformed anew.
    let (second, _, body) = get(app, "/calendars/strict").await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(body.contains("PRODID:-//Uni//Timetable//EN\r\n"));
    assert!(body.contains("UID:x-"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_profile_is_404() {
    let (status, _, body) = get(app(MemoryFetcher::default(), false), "/calendars/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("nope"));
}

#[tokio::test]
async fn missing_source_is_400() {
    let (status, _, _) = get(app(MemoryFetcher::default(), false), "/calendars/timetable").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fetch_failure_is_502_and_not_cached() {
    let fetcher = MemoryFetcher::default();
    let calls = Arc::clone(&fetcher.calls);
    let app = app(fetcher, false);

    let (first, _, _) = get(app.clone(), "/calendars/feed").await;
    let (second, _, _) = get(app, "/calendars/feed").await;

    assert_eq!(first, StatusCode::BAD_GATEWAY);
    assert_eq!(second, StatusCode::BAD_GATEWAY);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn malformed_upstream_is_502() {
    let fetcher = MemoryFetcher::default().with(FEED_URL, "<html>not a calendar</html>");
    let (status, _, body) = get(app(fetcher, false), "/calendars/feed").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("line 1"));
}

#[tokio::test]
async fn transform_failure_is_500_with_generic_message() {
    let no_uid = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:20260105T090000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let fetcher = MemoryFetcher::default().with(FEED_URL, no_uid);
    let (status, _, body) = get(app(fetcher, false), "/calendars/strict").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "calendar transformation failed");
}

#[tokio::test]
async fn transform_failure_details_when_verbose() {
    let no_uid = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:20260105T090000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let fetcher = MemoryFetcher::default().with(FEED_URL, no_uid);
    let (status, _, body) = get(app(fetcher, true), "/calendars/strict").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("missing required property UID"));
}

fn app_with_extension(extension: &std::path::Path) -> Router {
    let mut registry = registry();
    registry.insert(
        "broken",
        Profile {
            source: Some(FEED_URL.to_string()),
            formatter: FormatterConfig::default(),
            extension_file: Some(extension.to_path_buf()),
        },
    );
    let fetcher = MemoryFetcher::default().with(FEED_URL, FEED);
    let cache = SourceCache::new(Duration::from_secs(300), 16);
    router(AppState::new(registry, fetcher, cache, false))
}

#[tokio::test]
async fn missing_extension_file_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_extension(&dir.path().join("extension.json"));

    let (status, _, _) = get(app, "/calendars/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn malformed_extension_file_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extension.json");
    std::fs::write(&path, r#"{ "customEvents": [ { "created": 42 } ] }"#).unwrap();
    let app = app_with_extension(&path);

    let (status, _, body) = get(app, "/calendars/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("Profile configuration error"));
}
