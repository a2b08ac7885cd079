//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end through the HTTP fetcher. Mocks declare how often
//! they expect to be hit, so the servers verify the "fetched exactly once"
//! guarantees when they are dropped.

use ripple_crawl::config::{Config, CrawlerConfig};
use ripple_crawl::crawler::{crawl, CrawlSummary, FetchErrorKind};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given concurrency
fn create_test_config(concurrency: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency,
            retry_backoff_ms: 1,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    }
}

/// Mounts an HTML page that must be requested exactly once
async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a route answering `status` that must be requested exactly once
async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

async fn run(config: &Config, seeds: Vec<String>) -> CrawlSummary {
    crawl(config, seeds, CancellationToken::new())
        .await
        .expect("Failed to build crawler")
}

fn scheduled_set(summary: &CrawlSummary) -> HashSet<String> {
    summary.scheduled.iter().cloned().collect()
}

#[tokio::test]
async fn test_full_crawl_visits_each_page_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    // a -> [b, c], b -> [a, d], c -> [], d -> []
    mount_page(&server, "/a", r#"<a href="/b">B</a><a href="/c">C</a>"#).await;
    mount_page(&server, "/b", r#"<a href="/a">A</a><a href="d">D</a>"#).await;
    mount_page(&server, "/c", "<p>no links</p>").await;
    mount_page(&server, "/d", r#"<a href="/b">back to B</a>"#).await;

    let summary = run(&create_test_config(20), vec![format!("{}/a", base)]).await;

    let expected: HashSet<String> = ["a", "b", "c", "d"]
        .iter()
        .map(|p| format!("{}/{}", base, p))
        .collect();
    assert_eq!(scheduled_set(&summary), expected);
    assert_eq!(summary.scheduled_count(), 4);
    assert_eq!(summary.succeeded, 4);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn test_not_found_seeds_terminate_with_failures() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut seeds = Vec::new();
    for i in 0..5 {
        let route = format!("/missing-{}", i);
        mount_status(&server, &route, 404).await;
        seeds.push(format!("{}{}", base, route));
    }

    let summary = run(&create_test_config(1), seeds).await;

    assert_eq!(summary.scheduled_count(), 5);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failure_count(), 5);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind == Some(FetchErrorKind::Protocol) && f.reason.contains("404")));
}

#[tokio::test]
async fn test_failed_page_does_not_stop_other_branches() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/broken">x</a><a href="/ok">ok</a>"#).await;
    mount_status(&server, "/broken", 500).await;
    mount_page(&server, "/ok", r#"<a href="/deeper">deeper</a>"#).await;
    mount_page(&server, "/deeper", "<p>end</p>").await;

    let summary = run(&create_test_config(4), vec![format!("{}/", base)]).await;

    assert!(scheduled_set(&summary).contains(&format!("{}/deeper", base)));
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.failures[0].url, format!("{}/broken", base));
}

#[tokio::test]
async fn test_non_html_content_is_not_parsed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/report.pdf">report</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"<a href="/never">hidden</a>"#.to_string(), "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run(&create_test_config(2), vec![format!("{}/", base)]).await;

    assert_eq!(summary.scheduled_count(), 2);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.failures[0].kind, Some(FetchErrorKind::Content));
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/old/page"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new/page"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/new/page", r#"<a href="next">next</a>"#).await;
    mount_page(&server, "/new/next", "<p>done</p>").await;

    let summary = run(&create_test_config(2), vec![format!("{}/old/page", base)]).await;

    assert!(scheduled_set(&summary).contains(&format!("{}/new/next", base)));
    assert_eq!(summary.succeeded, 2);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", r#"<a href="/after">after</a>"#).await;
    mount_page(&server, "/after", "<p>ok</p>").await;

    let mut config = create_test_config(2);
    config.crawler.max_retries = 1;

    let summary = run(&config, vec![format!("{}/flaky", base)]).await;

    assert_eq!(summary.succeeded, 2);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn test_max_urls_limits_requests() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/one">1</a><a href="/two">2</a><a href="/three">3</a>"#,
    )
    .await;
    mount_page(&server, "/one", "<p>1</p>").await;
    for route in ["/two", "/three"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(4);
    config.crawler.max_urls = Some(2);

    let summary = run(&config, vec![format!("{}/", base)]).await;

    assert_eq!(summary.scheduled_count(), 2);
    assert_eq!(summary.skipped_links, 2);
}

#[tokio::test]
async fn test_unreachable_host_is_transport_failure() {
    // Nothing listens on the discard port of localhost in the test environment
    let summary = run(
        &create_test_config(1),
        vec!["http://127.0.0.1:9/".to_string()],
    )
    .await;

    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.failures[0].kind, Some(FetchErrorKind::Transport));
}
