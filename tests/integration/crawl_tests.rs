//! Integration tests for the crawler and the watcher
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl and watch cycles end-to-end.

use std::path::Path;
use suruga_watch::config::{parse_config, validate, Config};
use suruga_watch::crawler::{crawl_listing, Coordinator};
use suruga_watch::output::JsonLinesSink;
use suruga_watch::storage::{RunStatus, SqliteStorage, Storage};
use suruga_watch::{ProductRecord, WatchOutcome, Watcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(
    server_uri: &str,
    start_path: Option<&str>,
    max_pages: u32,
    db_path: &Path,
    webhook: bool,
) -> Config {
    let start_url = start_path
        .map(|p| format!("start-url = \"{}{}\"", server_uri, p))
        .unwrap_or_default();
    let notify = if webhook {
        format!(
            "[notify]\nwebhook-url = \"{}/webhook\"\nbatch-size = 10\n",
            server_uri
        )
    } else {
        String::new()
    };

    let toml = format!(
        r#"
[crawler]
max-pages = {max_pages}
request-delay = 0
request-timeout = 5

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[search]
base-url = "{server_uri}/en/products"
keyword = "figure"
{start_url}

[output]
database-path = "{db}"

{notify}
"#,
        db = db_path.display(),
    );

    let config = parse_config(&toml).expect("Failed to parse test config");
    validate(&config).expect("Test config should be valid");
    config
}

fn product_block(id: &str) -> String {
    format!(
        r#"<div class="item">
            <div class="img_product"><img src="/images/{id}.jpg"></div>
            <h3 class="title_product"><a data-product-id="{id}" href="/en/product/{id}">Product {id}</a></h3>
            <div class="launch_date">Release Date : 2024-01-01</div>
            <div class="cate_product"><a href="/en/category/hobby">Hobby</a><a href="/en/category/figure">Figure</a></div>
            <div class="price-new">¥1,000</div>
        </div>"#
    )
}

fn listing_page(ids: &[&str], pagination: &[&str]) -> String {
    let blocks: String = ids.iter().map(|id| product_block(id)).collect();
    let links: String = pagination
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#))
        .collect();
    format!(
        r#"<html><body>
            <div id="products">{blocks}</div>
            <ul class="pagination">{links}</ul>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn ids(records: &[ProductRecord]) -> Vec<String> {
    records.iter().filter_map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn test_pagination_cycle_fetches_each_page_once() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["1", "2"], &["/list/2", "/list/3"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/list/2",
        listing_page(&["3", "4"], &["/list/1", "/list/3"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/list/3",
        listing_page(&["5", "6"], &["/list/1", "/list/2", "#top"]),
        1,
    )
    .await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        50,
        &dir.path().join("db.sqlite"),
        false,
    );

    let (records, report) = crawl_listing(&config).await.expect("Crawl failed");

    assert_eq!(ids(&records), vec!["1", "2", "3", "4", "5", "6"]);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.products, 6);
    assert_eq!(report.pagination_links, 7);
}

#[tokio::test]
async fn test_page_budget_stops_crawl() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/list/1", listing_page(&["1"], &["/list/2"]), 1).await;
    mount_page(&mock_server, "/list/2", listing_page(&["2"], &["/list/3"]), 1).await;
    mount_page(&mock_server, "/list/3", listing_page(&["3"], &[]), 0).await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        2,
        &dir.path().join("db.sqlite"),
        false,
    );

    let (records, report) = crawl_listing(&config).await.expect("Crawl failed");

    assert_eq!(ids(&records), vec!["1", "2"]);
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_malformed_page_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let malformed = r#"<html><body><div id="products">
        <div class="item">
            <h3 class="title_product"><a data-product-id="99" href="/en/product/99">Broken</a></h3>
            <div class="launch_date">soon</div>
        </div>
    </div>
    <ul class="pagination"><li><a href="/list/4">4</a></li></ul>
    </body></html>"#;

    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["1"], &["/list/2", "/list/3"]),
        1,
    )
    .await;
    mount_page(&mock_server, "/list/2", malformed.to_string(), 1).await;
    mount_page(&mock_server, "/list/3", listing_page(&["3"], &[]), 1).await;
    // Only linked from the malformed page
    mount_page(&mock_server, "/list/4", listing_page(&["4"], &[]), 0).await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        50,
        &dir.path().join("db.sqlite"),
        false,
    );

    let (records, report) = crawl_listing(&config).await.expect("Crawl failed");

    assert_eq!(ids(&records), vec!["1", "3"]);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 1);
}

#[tokio::test]
async fn test_http_failures_are_counted() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["1"], &["/list/2", "/list/3", "/list/4"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/list/4", listing_page(&["4"], &[]), 1).await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        50,
        &dir.path().join("db.sqlite"),
        false,
    );

    let (records, report) = crawl_listing(&config).await.expect("Crawl failed");

    assert_eq!(ids(&records), vec!["1", "4"]);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 2);
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /list/2\n"),
        )
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["1"], &["/list/2", "/list/3"]),
        1,
    )
    .await;
    mount_page(&mock_server, "/list/2", listing_page(&["2"], &[]), 0).await;
    mount_page(&mock_server, "/list/3", listing_page(&["3"], &[]), 1).await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        50,
        &dir.path().join("db.sqlite"),
        false,
    );

    let (records, report) = crawl_listing(&config).await.expect("Crawl failed");

    assert_eq!(ids(&records), vec!["1", "3"]);
    assert_eq!(report.pages_skipped, 1);
}

#[tokio::test]
async fn test_records_stream_as_json_lines() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(&mock_server, "/list/1", listing_page(&["1", "2"], &[]), 1).await;

    let config = create_test_config(
        &mock_server.uri(),
        Some("/list/1"),
        50,
        &dir.path().join("db.sqlite"),
        false,
    );

    let mut coordinator = Coordinator::new(&config).expect("Failed to create coordinator");
    let mut sink = JsonLinesSink::new(Vec::new());
    coordinator.run(&mut sink).await.expect("Crawl failed");

    assert_eq!(sink.written(), 2);
    let output = String::from_utf8(sink.into_inner()).unwrap();
    let first: serde_json::Value =
        serde_json::from_str(output.lines().next().unwrap()).unwrap();

    assert_eq!(first["id"], "1");
    assert_eq!(first["url"], "/en/product/1");
    assert_eq!(first["date"], "2024-01-01");
    assert_eq!(first["categories"][1]["name"], "Figure");
}

#[tokio::test]
async fn test_watcher_seeds_then_notifies_in_batches() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("watch.db");

    let config = create_test_config(&mock_server.uri(), None, 50, &db_path, true);

    // First tick: the built search URL lists three products
    Mock::given(method("GET"))
        .and(path("/en/products"))
        .and(query_param("keyword", "figure"))
        .and(query_param("sort", "updated_date_desc"))
        .respond_with(html(listing_page(&["a", "b", "c"], &[])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut watcher = Watcher::new(config.clone(), "hash".to_string()).unwrap();
    let outcome = watcher.run_once().await.expect("First tick failed");
    assert_eq!(outcome, WatchOutcome::Seeded { products: 3 });
    mock_server.verify().await;
    mock_server.reset().await;

    // Second tick: twelve new products on top of the known ones
    let new_ids: Vec<String> = (1..=12).map(|i| format!("n{}", i)).collect();
    let mut listed: Vec<&str> = new_ids.iter().map(String::as_str).collect();
    listed.extend(["a", "b", "c"]);

    Mock::given(method("GET"))
        .and(path("/en/products"))
        .respond_with(html(listing_page(&listed, &[])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&mock_server)
        .await;

    let outcome = watcher.run_once().await.expect("Second tick failed");
    assert_eq!(outcome, WatchOutcome::Compared { new: 12 });

    let posts: Vec<serde_json::Value> = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/webhook")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["embeds"].as_array().unwrap().len(), 10);
    assert_eq!(posts[1]["embeds"].as_array().unwrap().len(), 2);
    assert!(posts[0]["content"].is_null());

    let embed = &posts[0]["embeds"][0];
    assert_eq!(embed["title"], "Product n1");
    assert_eq!(
        embed["url"],
        format!("{}/en/product/n1", mock_server.uri())
    );
    assert_eq!(embed["fields"][1]["value"], "Figure");
    assert_eq!(embed["fields"][2]["value"], "¥1,000");
    mock_server.verify().await;

    // Third tick: nothing new, nothing posted
    let outcome = watcher.run_once().await.expect("Third tick failed");
    assert_eq!(outcome, WatchOutcome::Compared { new: 0 });

    let storage = watcher.storage();
    assert_eq!(storage.count_products().unwrap(), 15);
    assert_eq!(storage.count_runs(Some(RunStatus::Completed)).unwrap(), 3);

    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.products_seen, 15);
    assert_eq!(latest.products_new, 0);
}

#[tokio::test]
async fn test_failed_tick_marks_run_failed() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("watch.db");

    Mock::given(method("GET"))
        .and(path("/en/products"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), None, 50, &db_path, false);
    let mut watcher = Watcher::new(config, "hash".to_string()).unwrap();

    assert!(watcher.run_once().await.is_err());

    let run = watcher.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.is_some());
    assert_eq!(watcher.storage().count_products().unwrap(), 0);

    // The database survives the watcher
    drop(watcher);
    let reopened = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(reopened.count_runs(None).unwrap(), 1);
}
