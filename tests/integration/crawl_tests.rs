//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use ripple_harvest::config::Config;
use ripple_harvest::storage::{CacheStore, SqliteCache};
use ripple_harvest::{run_crawl, CrawlReport, Orchestrator};
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(seed: String, dir: &TempDir) -> Config {
    let mut config = Config {
        seeds: vec![seed],
        ..Config::default()
    };
    config.crawler.per_domain_delay_ms = 0;
    config.crawler.max_pages = 50;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config.output.output_path = dir.path().join("records.jsonl");
    config.output.report_path = dir.path().join("report.json");
    config
}

fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body><p>{} content</p>{}</body></html>",
        title, title, anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(title, links))
        .mount(server)
        .await;
}

/// Mounts `/` -> `/page1`, `/page2`; `/page1` -> `/page3`
async fn mount_small_site(server: &MockServer) {
    mount_page(server, "/", "Home", &["/page1", "/page2"]).await;
    mount_page(server, "/page1", "Page 1", &["/page3", "/"]).await;
    mount_page(server, "/page2", "Page 2", &[]).await;
    mount_page(server, "/page3", "Page 3", &[]).await;
}

fn read_records(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("record is valid JSON"))
        .collect()
}

fn record_paths(path: &Path) -> BTreeSet<String> {
    read_records(path)
        .iter()
        .map(|record| {
            let url = url::Url::parse(record["url"].as_str().unwrap()).unwrap();
            url.path().to_string()
        })
        .collect()
}

fn read_report(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("report written"))
        .expect("report is valid JSON")
}

#[tokio::test]
async fn test_single_page_budget() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.crawler.max_pages = 1;

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.summary.ok, 1);
    assert_eq!(report.summary.fail, 0);
    assert_eq!(report.summary.success_rate, 1.0);
    assert_eq!(report.pages_processed, 1);

    let records = read_records(&dir.path().join("records.jsonl"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["url"], format!("{}/", mock_server.uri()));
    assert_eq!(records[0]["title"], "Home");
    assert_eq!(records[0]["extractor"], "default");

    let written = read_report(&dir.path().join("report.json"));
    assert_eq!(written["ok"], 1);
    assert_eq!(written["fail"], 0);
    assert_eq!(written["success_rate"], 1.0);
}

#[tokio::test]
async fn test_full_crawl_follows_links() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/", mock_server.uri()), &dir);

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.frontier_remaining, 0);
    assert_eq!(report.seen_total, 4);
    assert!(!report.cancelled);

    let paths = record_paths(&dir.path().join("records.jsonl"));
    let expected: BTreeSet<String> = ["/", "/page1", "/page2", "/page3"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(paths, expected);
}

#[tokio::test]
async fn test_max_pages_bound() {
    let mock_server = MockServer::start().await;
    let links: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", "Hub", &link_refs).await;
    Mock::given(method("GET"))
        .respond_with(html_page("Leaf", &[]))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.crawler.max_pages = 5;
    config.crawler.concurrency = 3;
    // The catch-all mock would also answer /robots.txt
    config.crawler.respect_robots = false;

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.pages_processed, 5);
    assert_eq!(read_records(&dir.path().join("records.jsonl")).len(), 5);
    assert!(report.frontier_remaining > 0);
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "Home", &["/allowed", "/admin"]).await;
    mount_page(&mock_server, "/allowed", "Allowed", &[]).await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html_page("Admin", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/", mock_server.uri()), &dir);

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.robots_skipped, 1);
    assert_eq!(report.pages_processed, 2);
    let paths = record_paths(&dir.path().join("records.jsonl"));
    assert!(paths.contains("/allowed"));
    assert!(!paths.contains("/admin"));
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "Home", &[]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.crawler.respect_robots = false;

    let report = run_crawl(config).await.expect("Crawl failed");
    assert_eq!(report.summary.ok, 1);
    assert_eq!(report.robots_skipped, 0);
}

#[tokio::test]
async fn test_error_status_classified() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "Home", &["/missing", "/busy"]).await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/", mock_server.uri()), &dir);

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.summary.ok, 1);
    assert_eq!(report.summary.fail, 2);
    let kinds: BTreeSet<&str> = report
        .summary
        .top_error_kinds
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert!(kinds.contains("not_found"));
    assert!(kinds.contains("server_error"));

    let health = &report.summary.per_domain_health["127.0.0.1"];
    assert_eq!(health.ok, 1);
    assert_eq!(health.fail, 2);
    assert!((health.rate - 1.0 / 3.0).abs() < 1e-9);

    // Failed pages produce no records
    assert_eq!(read_records(&dir.path().join("records.jsonl")).len(), 1);
}

#[tokio::test]
async fn test_equivalent_urls_fetched_once() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        "Home",
        &["/a", "/a/", "/a?utm_source=news", "/a#section", "/A/../a"],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("A", &["/"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/", mock_server.uri()), &dir);

    let report = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(report.pages_processed, 2);
    assert_eq!(read_records(&dir.path().join("records.jsonl")).len(), 2);
}

#[tokio::test]
async fn test_resume_yields_same_page_set() {
    let reference_server = MockServer::start().await;
    mount_small_site(&reference_server).await;
    let reference_dir = TempDir::new().unwrap();
    let reference = create_test_config(format!("{}/", reference_server.uri()), &reference_dir);
    run_crawl(reference).await.expect("Reference crawl failed");
    let uninterrupted = record_paths(&reference_dir.path().join("records.jsonl"));

    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.json");

    // First run stops after two pages
    let mut first = create_test_config(format!("{}/", mock_server.uri()), &dir);
    first.crawler.max_pages = 2;
    first.output.checkpoint_path = Some(checkpoint_path.clone());
    first.output.checkpoint_every = 1;
    let report = run_crawl(first.clone()).await.expect("First run failed");
    assert_eq!(report.pages_processed, 2);
    assert!(report.frontier_remaining > 0);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&checkpoint_path).unwrap()).unwrap();
    assert_eq!(
        saved["queue"].as_array().unwrap().len(),
        report.frontier_remaining
    );

    // Second run resumes from the checkpoint
    let mut second = first;
    second.crawler.max_pages = 50;
    second.crawler.resume = true;
    let report = run_crawl(second).await.expect("Resumed run failed");
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.frontier_remaining, 0);

    let records = read_records(&dir.path().join("records.jsonl"));
    assert_eq!(records.len(), 4, "no page is fetched twice across runs");
    assert_eq!(record_paths(&dir.path().join("records.jsonl")), uninterrupted);
}

#[tokio::test]
async fn test_cancelled_run_still_checkpoints_and_reports() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page("Never", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.output.checkpoint_path = Some(dir.path().join("checkpoint.json"));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report: CrawlReport = Orchestrator::new(config)
        .unwrap()
        .run(cancel)
        .await
        .expect("Cancelled run failed");

    assert!(report.cancelled);
    assert_eq!(report.pages_processed, 0);
    assert_eq!(report.frontier_remaining, 1);

    let written = read_report(&dir.path().join("report.json"));
    assert_eq!(written["cancelled"], true);
    assert_eq!(written["success_rate"], 0.0);

    let saved: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("checkpoint.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["queue"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cache_records_every_response() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "Home", &["/gone"]).await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.db");
    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.output.cache_path = Some(cache_path.clone());

    run_crawl(config).await.expect("Crawl failed");

    let cache = SqliteCache::new(&cache_path).unwrap();
    assert_eq!(cache.count().unwrap(), 2);
    let gone = cache
        .get(&format!("{}/gone", mock_server.uri()))
        .unwrap()
        .expect("404 responses are cached too");
    assert_eq!(gone.status_code, 404);
}

#[tokio::test]
async fn test_host_plugin_is_used() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    "<title>Chrome</title><h1 class=\"headline\">Story</h1><article><p>Body</p></article>",
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let plugin_dir = dir.path().join("plugins");
    std::fs::create_dir(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("127.0.0.1.toml"),
        "title = \"h1.headline\"\ntext = \"article p\"\n",
    )
    .unwrap();

    let mut config = create_test_config(format!("{}/", mock_server.uri()), &dir);
    config.output.plugin_dir = Some(plugin_dir);

    run_crawl(config).await.expect("Crawl failed");

    let records = read_records(&dir.path().join("records.jsonl"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["extractor"], "plugin:127.0.0.1");
    assert_eq!(records[0]["title"], "Story");
    assert_eq!(records[0]["text"], "Body");
}
