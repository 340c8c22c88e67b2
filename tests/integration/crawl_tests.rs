//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full fetch, parse, deduplicate and store cycle end-to-end.

use listing_harvest::config::{
    Config, CrawlerConfig, OutputConfig, OutputFormat, SearchConfig, UserAgentConfig,
};
use listing_harvest::crawler::{run_harvest, Driver, HttpFetcher};
use listing_harvest::storage::SqliteStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, directory: &Path, topics: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            pages: 3,
            workers: 3,
            max_retries: 2,
            batch_limit: 50,
        },
        search: SearchConfig {
            base_url: format!("{}/jobs/search", base_url),
            location: "us".to_string(),
            locality: "United States".to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            directory: directory.display().to_string(),
            format: OutputFormat::Csv,
        },
        credentials: None,
    }
}

/// Builds one search-result card
fn card(company: &str, title: &str, link: &str, location: &str) -> String {
    format!(
        r#"<li><div class="base-card">
            <a class="base-card__full-link" href="{link}"><span class="sr-only">{title}</span></a>
            <div class="base-search-card__info">
                <h3 class="base-search-card__title">{title}</h3>
                <h4 class="base-search-card__subtitle"><a href="https://example.com/c">{company}</a></h4>
                <div class="base-search-card__metadata">
                    <span class="job-search-card__location">{location}</span>
                </div>
            </div>
        </div></li>"#
    )
}

/// A listing page with ten cards whose companies are `<prefix>-0..9`
fn listing_page(prefix: &str) -> String {
    let cards: String = (0..10)
        .map(|i| {
            card(
                &format!("{}-{}", prefix, i),
                "Software Engineer",
                &format!("https://example.com/jobs/{}/{}", prefix, i),
                "Austin, TX",
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", cards)
}

async fn mount_page(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .and(query_param("start", start))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_single_topic() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for (start, prefix) in [("0", "p0"), ("10", "p1"), ("20", "p2")] {
        Mock::given(method("GET"))
            .and(path("/jobs/search"))
            .and(query_param("keywords", "software engineer"))
            .and(query_param("location", "United States"))
            .and(query_param("original_referer", ""))
            .and(query_param("start", start))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(prefix)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), dir.path(), &["software engineer"]);
    let summary = run_harvest(config).await.expect("harvest should succeed");

    assert!(summary.is_complete());
    assert_eq!(summary.total_rows(), 30);
    assert_eq!(summary.topics[0].crawl.pages_succeeded, vec![0, 1, 2]);

    let content = std::fs::read_to_string(dir.path().join("software-engineer.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 31);
    assert_eq!(lines[0], "primary_key,title,link,location");
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("primary_key")).count(),
        1
    );
    assert!(content.contains("p2-9,Software Engineer,https://example.com/jobs/p2/9,\"Austin, TX\""));
}

#[tokio::test]
async fn test_failed_page_is_reported_and_others_stored() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "0", listing_page("p0")).await;
    mount_page(&mock_server, "20", listing_page("p2")).await;

    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .and(query_param("start", "10"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    let summary = run_harvest(config).await.expect("page failures do not fail the run");

    let topic = &summary.topics[0];
    assert!(!topic.is_complete());
    assert_eq!(topic.failed_pages(), vec![1]);
    assert!(topic.crawl.failures[0].message.contains("Max retries exceeded"));
    assert_eq!(topic.rows_written(), 20);

    let content = std::fs::read_to_string(dir.path().join("rust.csv")).unwrap();
    assert_eq!(content.lines().count(), 21);
    assert!(!content.contains("p1-"));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Mounted first so it wins until exhausted
    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "0", listing_page("p0")).await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    config.crawler.pages = 1;
    config.crawler.workers = 1;

    let summary = run_harvest(config).await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.total_rows(), 10);
}

#[tokio::test]
async fn test_second_run_appends_without_header() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("same")))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    config.crawler.pages = 1;

    run_harvest(config.clone()).await.unwrap();
    run_harvest(config).await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("rust.csv")).unwrap();
    assert_eq!(content.lines().count(), 21);
    assert_eq!(
        content
            .lines()
            .filter(|l| *l == "primary_key,title,link,location")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_keys_across_pages_are_dropped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Every page returns the same ten companies
    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page("repeat")))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    let summary = run_harvest(config).await.unwrap();

    let topic = &summary.topics[0];
    assert_eq!(topic.rows_written(), 10);
    assert_eq!(topic.pipeline.duplicates, 20);
    assert_eq!(topic.crawl.records_received, 30);

    let content = std::fs::read_to_string(dir.path().join("rust.csv")).unwrap();
    assert_eq!(content.lines().count(), 11);
}

#[tokio::test]
async fn test_small_batches_flush_during_crawl() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "0", listing_page("p0")).await;
    mount_page(&mock_server, "10", listing_page("p1")).await;
    mount_page(&mock_server, "20", listing_page("p2")).await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    config.crawler.batch_limit = 4;

    let summary = run_harvest(config).await.unwrap();

    let topic = &summary.topics[0];
    assert_eq!(topic.rows_written(), 30);
    assert!(topic.pipeline.batches_written >= 2);
    assert_eq!(topic.pipeline.pending, 0);
}

#[tokio::test]
async fn test_sqlite_destination() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "0", listing_page("p0")).await;
    mount_page(&mock_server, "10", listing_page("p1")).await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["data analyst"]);
    config.crawler.pages = 2;
    config.output.format = OutputFormat::Sqlite;

    let fetcher = Arc::new(HttpFetcher::from_config(&config).unwrap());
    let summary = Driver::with_fetcher(config, fetcher).run().await.unwrap();
    assert_eq!(summary.total_rows(), 20);

    let store = SqliteStore::new(&dir.path().join("data-analyst.sqlite")).unwrap();
    assert_eq!(store.count_records().unwrap(), 20);
    let records = store.load_records().unwrap();
    assert!(records.iter().any(|r| r.primary_key() == "p1-9"));
}

#[tokio::test]
async fn test_zero_pages_writes_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    config.crawler.pages = 0;

    let fetcher = Arc::new(HttpFetcher::from_config(&config).unwrap());
    let summary = Driver::with_fetcher(config, fetcher).run().await.unwrap();

    assert_eq!(summary.total_rows(), 0);
    assert!(!dir.path().join("rust.csv").exists());
}

#[tokio::test]
async fn test_malformed_page_is_retried_then_reported() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // A card without its company subtitle fails the whole page
    let malformed = r#"<html><body><ul><li><div class="base-card">
        <a href="https://example.com/jobs/1">Job</a>
        <div class="base-search-card__info">
            <h3 class="base-search-card__title">Software Engineer</h3>
            <span class="job-search-card__location">Austin, TX</span>
        </div>
    </div></li></ul></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(malformed))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path(), &["rust"]);
    config.crawler.pages = 1;

    let summary = run_harvest(config).await.unwrap();

    let topic = &summary.topics[0];
    assert_eq!(topic.failed_pages(), vec![0]);
    let message = &topic.crawl.failures[0].message;
    assert!(message.contains("after 3 attempts"));
    assert!(message.contains("failed to parse"));
    assert!(message.contains("missing its company"));
    assert_eq!(topic.rows_written(), 0);
    assert!(!dir.path().join("rust.csv").exists());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_reported_as_network_failure() {
    let dir = TempDir::new().unwrap();

    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = create_test_config(&format!("http://127.0.0.1:{}", port), dir.path(), &["rust"]);
    config.crawler.pages = 2;
    config.crawler.max_retries = 1;

    let summary = run_harvest(config).await.expect("page failures do not fail the run");

    let topic = &summary.topics[0];
    assert_eq!(topic.failed_pages(), vec![0, 1]);
    for failure in &topic.crawl.failures {
        assert!(failure.message.contains("after 2 attempts"));
        assert!(failure.message.contains("network error"));
    }
    assert_eq!(topic.rows_written(), 0);
}
