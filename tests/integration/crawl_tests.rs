//! Integration tests for the crawler
//!
//! These tests use wiremock to serve Apache-style directory listings and
//! run the full crawl cycle end-to-end.

use index_harvester::config::{parse_config, Config};
use index_harvester::crawler::{build_http_client, crawl, CrawlCoordinator, CrawlSettings};
use index_harvester::{CancellationFlag, DirectoryId, Inventory};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders an Apache-style listing; each row is `(href, size, date)`
fn listing(title: &str, rows: &[(&str, &str, &str)]) -> String {
    let mut html = format!(
        r#"<html><head><title>Index of {title}</title></head><body>
<h1>Index of {title}</h1>
<table>
<tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=S;O=A">Size</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
<tr><td><a href="../">Parent Directory</a></td><td>-</td><td>&nbsp;</td></tr>
"#
    );
    for (href, size, date) in rows {
        html.push_str(&format!(
            "<tr><td><a href=\"{href}\">{href}</a></td><td>{size}</td><td>{date}</td></tr>\n"
        ));
    }
    html.push_str("</table></body></html>");
    html
}

async fn mount_listing(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Folders 1 (a.txt), 2 (empty), 3 (b.bin + subfolder 30), 3/30 (c.txt)
async fn mount_sample_tree(server: &MockServer) {
    mount_listing(
        server,
        "/1/",
        listing("/1", &[("a.txt", "10", "2024-01-01 10:00")]),
    )
    .await;
    mount_listing(server, "/2/", listing("/2", &[])).await;
    mount_listing(
        server,
        "/3/",
        listing(
            "/3",
            &[("30/", "-", "2024-01-03 09:00"), ("b.bin", "500", "2024-01-03 10:00")],
        ),
    )
    .await;
    mount_listing(
        server,
        "/3/30/",
        listing("/3/30", &[("c.txt", "3", "2024-01-04 10:00")]),
    )
    .await;
}

fn config_for(server: &MockServer, range_end: u64, max_depth: u32) -> Config {
    parse_config(&format!(
        r#"
[crawler]
base-url = "{}/"
max-depth = {}
max-concurrency = 4
range-end = {}
timeout-secs = 5
"#,
        server.uri(),
        max_depth,
        range_end
    ))
    .expect("test config is valid")
}

fn ids(inventory: &Inventory) -> Vec<String> {
    inventory.ids().map(|id| id.to_string()).collect()
}

fn id(n: u64) -> DirectoryId {
    DirectoryId::from_number(n)
}

#[tokio::test]
async fn test_end_to_end_sample_tree() {
    let server = MockServer::start().await;
    mount_sample_tree(&server).await;

    let config = config_for(&server, 4, 2);
    let outcome = crawl(&config, CancellationFlag::new()).await.unwrap();
    let inventory = &outcome.inventory;

    assert_eq!(ids(inventory), vec!["1", "3", "30"]);

    let one = inventory.get(&id(1)).unwrap();
    assert_eq!(one.url, format!("{}/1/", server.uri()));
    assert_eq!(one.files.len(), 1);
    assert_eq!(one.files[0].original_name, "a.txt");
    assert_eq!(one.files[0].url, format!("{}/1/a.txt", server.uri()));
    assert_eq!(one.files[0].size, "10");
    assert_eq!(one.files[0].date, "2024-01-01 10:00");

    let three = inventory.get(&id(3)).unwrap();
    assert_eq!(three.subfolders, vec!["30".to_string()]);
    assert_eq!(three.files.len(), 1);
    assert_eq!(three.files[0].original_name, "b.bin");
    assert_eq!(three.files[0].size, "500");

    let thirty = inventory.get(&id(30)).unwrap();
    assert_eq!(thirty.url, format!("{}/3/30/", server.uri()));
    assert_eq!(thirty.files[0].original_name, "c.txt");

    assert_eq!(outcome.stats.roots_submitted, 3);
    assert_eq!(outcome.stats.fetches, 4);
    assert_eq!(outcome.stats.empty, 1);
    assert_eq!(outcome.stats.failed_fetches, 0);
    assert_eq!(outcome.stats.total_files, 3);
}

#[tokio::test]
async fn test_duplicate_roots_fetch_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing("/1", &[("a.txt", "10", "")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = build_http_client("TestHarvester/1.0", Duration::from_secs(5), 8).unwrap();
    let settings = CrawlSettings {
        max_depth: 2,
        max_concurrency: 8,
        timeout: Duration::from_secs(5),
    };
    let coordinator = CrawlCoordinator::new(client, settings, CancellationFlag::new());

    let root = Url::parse(&format!("{}/1/", server.uri())).unwrap();
    let roots = vec![root.clone(); 16];
    let outcome = coordinator.run(roots).await;

    assert_eq!(outcome.inventory.len(), 1);
    assert_eq!(outcome.stats.roots_submitted, 16);
    assert_eq!(coordinator.fetch_count(), 1);

    // Revisiting after the run is still a no-op
    assert!(coordinator.visit_folder(root, 0).await.is_empty());
    assert_eq!(coordinator.fetch_count(), 1);
}

#[tokio::test]
async fn test_failed_folder_does_not_stop_siblings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, "/2/", listing("/2", &[("b.bin", "500", "")])).await;
    Mock::given(method("GET"))
        .and(path("/3/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let mut config = config_for(&server, 4, 1);
    config.crawler.timeout_secs = 1;
    let outcome = crawl(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(ids(&outcome.inventory), vec!["2"]);
    assert_eq!(outcome.stats.failed_fetches, 2);
}

#[tokio::test]
async fn test_absent_folders_are_not_failures() {
    let server = MockServer::start().await;
    mount_listing(&server, "/2/", listing("/2", &[("x.zip", "1K", "")])).await;

    // Everything but /2/ falls through to wiremock's 404
    let config = config_for(&server, 6, 2);
    let outcome = crawl(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(ids(&outcome.inventory), vec!["2"]);
    assert_eq!(outcome.stats.absent, 4);
    assert_eq!(outcome.stats.failed_fetches, 0);
}

#[tokio::test]
async fn test_crawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_sample_tree(&server).await;
    let config = config_for(&server, 4, 2);

    let first = crawl(&config, CancellationFlag::new()).await.unwrap();
    let second = crawl(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(first.inventory, second.inventory);
    assert_eq!(
        first.inventory.to_json_string().unwrap(),
        second.inventory.to_json_string().unwrap()
    );
}

#[tokio::test]
async fn test_max_depth_stops_recursion() {
    let server = MockServer::start().await;

    // Mounted first so it takes precedence over the tree's /3/30/ listing
    Mock::given(method("GET"))
        .and(path("/3/30/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .named("subfolder below max depth")
        .mount(&server)
        .await;
    mount_sample_tree(&server).await;

    let config = config_for(&server, 4, 0);
    let outcome = crawl(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(ids(&outcome.inventory), vec!["1", "3"]);
    // Still recorded on the parent even though it was not fetched
    let three = outcome.inventory.get(&id(3)).unwrap();
    assert_eq!(three.subfolders, vec!["30".to_string()]);
}

#[tokio::test]
async fn test_inventory_json_round_trip() {
    let server = MockServer::start().await;
    mount_sample_tree(&server).await;
    let config = config_for(&server, 4, 2);

    let outcome = crawl(&config, CancellationFlag::new()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file_structure.json");
    outcome.inventory.save_json(&path).unwrap();

    let loaded = Inventory::load_json(&path).unwrap();
    assert_eq!(loaded, outcome.inventory);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["3"]["subfolders"][0], "30");
    assert_eq!(json["1"]["files"][0]["original_name"], "a.txt");
}
