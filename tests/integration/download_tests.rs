//! Integration tests for the download path
//!
//! These tests use wiremock to stand in for the remote server and check
//! retry, partial-file and fan-out behavior against a temp directory.

use index_harvester::config::parse_config;
use index_harvester::crawler::build_http_client;
use index_harvester::download::{
    harvest, partial_path, DownloadCoordinator, NoopObserver, TransferManager, TransferOutcome,
    TransferSettings,
};
use index_harvester::CancellationFlag;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transfer_manager(retries: u32) -> TransferManager {
    let client = build_http_client("TestHarvester/1.0", Duration::from_secs(5), 4).unwrap();
    let settings = TransferSettings {
        chunk_size: 4096,
        timeout: Duration::from_secs(5),
        retries,
        retry_delay: Duration::from_millis(10),
        progress_interval: Duration::from_millis(1),
    };
    TransferManager::new(client, settings).with_observer(Arc::new(NoopObserver))
}

fn file_url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn mount_file(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn listing(rows: &[&str]) -> String {
    let mut html = String::from(
        "<html><body><pre><a href=\"?C=N;O=D\">Name</a>\n<a href=\"../\">Parent Directory</a>\n",
    );
    for href in rows {
        html.push_str(&format!("<a href=\"{href}\">{href}</a>\n"));
    }
    html.push_str("</pre></body></html>");
    html
}

async fn mount_directory(server: &MockServer, number: u64, files: &[&str]) {
    let route = format!("/{}/", number);
    Mock::given(method("HEAD"))
        .and(path(route.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(files)))
        .mount(server)
        .await;
}

fn no_partial_left(local: &Path) -> bool {
    !partial_path(local).exists()
}

#[tokio::test]
async fn test_existing_file_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.txt");
    std::fs::write(&local, b"old").unwrap();

    let outcome = transfer_manager(3)
        .download(&file_url(&server, "/1/a.txt"), &local)
        .await;

    assert_eq!(outcome, TransferOutcome::AlreadyPresent);
    assert!(outcome.is_success());
    assert_eq!(std::fs::read(&local).unwrap(), b"old");
}

#[tokio::test]
async fn test_fails_twice_then_succeeds() {
    let server = MockServer::start().await;
    let body = payload(500);

    // Mounted first, so it answers the first two requests
    Mock::given(method("GET"))
        .and(path("/3/b.bin"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3/b.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("b.bin");

    let outcome = transfer_manager(3)
        .download(&file_url(&server, "/3/b.bin"), &local)
        .await;

    assert!(matches!(outcome, TransferOutcome::Downloaded { bytes: 500, .. }));
    assert_eq!(std::fs::read(&local).unwrap(), body);
    assert!(no_partial_left(&local));
}

#[tokio::test]
async fn test_always_failing_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/a.txt"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.txt");

    let outcome = transfer_manager(3)
        .download(&file_url(&server, "/1/a.txt"), &local)
        .await;

    match outcome {
        TransferOutcome::Failed { attempts, error } => {
            assert_eq!(attempts, 3);
            assert!(error.contains("503"), "unexpected error: {}", error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!local.exists());
    assert!(no_partial_left(&local));
}

#[tokio::test]
async fn test_unresponsive_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload(64))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = build_http_client("TestHarvester/1.0", Duration::from_secs(5), 1).unwrap();
    let settings = TransferSettings {
        timeout: Duration::from_millis(200),
        retries: 2,
        retry_delay: Duration::from_millis(10),
        ..TransferSettings::default()
    };
    let manager = TransferManager::new(client, settings).with_observer(Arc::new(NoopObserver));

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("slow.bin");
    let outcome = manager
        .download(&file_url(&server, "/1/slow.bin"), &local)
        .await;

    assert!(matches!(outcome, TransferOutcome::Failed { attempts: 2, .. }));
    assert!(!local.exists());
}

#[tokio::test]
async fn test_directory_fan_out_with_mixed_outcomes() {
    let server = MockServer::start().await;
    mount_file(&server, "/5/a.txt", payload(10)).await;
    mount_file(&server, "/5/b.bin", payload(500)).await;
    Mock::given(method("GET"))
        .and(path("/5/broken.zip"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let coordinator = DownloadCoordinator::new(transfer_manager(2), root.path(), 2);

    let urls = vec![
        file_url(&server, "/5/a.txt"),
        file_url(&server, "/5/broken.zip"),
        file_url(&server, "/5/b.bin"),
    ];
    let report = coordinator
        .download_directory(5, &urls, &CancellationFlag::new())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.downloaded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.bytes_transferred(), 510);

    let directory = root.path().join("5");
    assert_eq!(std::fs::read(directory.join("a.txt")).unwrap(), payload(10));
    assert_eq!(std::fs::read(directory.join("b.bin")).unwrap(), payload(500));
    assert!(!directory.join("broken.zip").exists());
    assert!(no_partial_left(&directory.join("broken.zip")));

    // A second pass finds everything that succeeded already in place
    let again = coordinator
        .download_directory(5, &urls[..1], &CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(again.already_present(), 1);
}

#[tokio::test]
async fn test_sequential_harvest_with_cutoff() {
    let server = MockServer::start().await;

    // 1 has a file, 2 is missing, 3 lists nothing, 4 has a file, 5.. missing
    mount_directory(&server, 1, &["x.txt"]).await;
    mount_file(&server, "/1/x.txt", b"xx".to_vec()).await;
    mount_directory(&server, 3, &[]).await;
    mount_directory(&server, 4, &["y.txt", "y.txt"]).await;
    mount_file(&server, "/4/y.txt", b"yyyy".to_vec()).await;

    let root = tempfile::tempdir().unwrap();
    let config = parse_config(&format!(
        r#"
[crawler]
base-url = "{}/"

[download]
max-concurrency = 2
retries = 1
retry-delay-ms = 10
start-number = 1
max-consecutive-empty = 3
save-root = "{}"
"#,
        server.uri(),
        root.path().display()
    ))
    .unwrap();

    let stats = harvest(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(stats.directories_completed, 2);
    assert_eq!(stats.directories_empty, 1);
    assert_eq!(stats.directories_absent, 4);
    assert_eq!(stats.files_downloaded, 2);
    assert_eq!(stats.bytes_transferred, 6);
    assert_eq!(stats.next_number, 8);
    assert!(stats.stopped_by_cutoff);
    assert!(!stats.cancelled);

    assert_eq!(std::fs::read(root.path().join("1").join("x.txt")).unwrap(), b"xx");
    assert_eq!(std::fs::read(root.path().join("4").join("y.txt")).unwrap(), b"yyyy");
    assert!(!root.path().join("3").exists());
}

async fn mount_slow_file(server: &MockServer, route: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload(16))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn cancel_after(delay: Duration) -> CancellationFlag {
    let cancel = CancellationFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        flag.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_interrupt_stops_queued_transfers() {
    let server = MockServer::start().await;
    let names = ["f1.bin", "f2.bin", "f3.bin", "f4.bin"];
    for name in names {
        mount_slow_file(&server, &format!("/1/{name}"), Duration::from_millis(600)).await;
    }

    let root = tempfile::tempdir().unwrap();
    let coordinator = DownloadCoordinator::new(transfer_manager(1), root.path(), 1);
    let urls: Vec<Url> = names
        .iter()
        .map(|name| file_url(&server, &format!("/1/{name}")))
        .collect();

    // Raised while the first transfer is in flight
    let cancel = cancel_after(Duration::from_millis(200));
    let report = coordinator.download_directory(1, &urls, &cancel).await.unwrap();

    assert_eq!(report.downloaded(), 1);
    assert_eq!(report.not_started, urls[1..].to_vec());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(root.path().join("1").join("f1.bin").exists());
    assert!(!root.path().join("1").join("f2.bin").exists());
}

#[tokio::test]
async fn test_interrupted_directory_is_the_resume_point() {
    let server = MockServer::start().await;
    mount_directory(&server, 1, &["f1.bin", "f2.bin", "f3.bin"]).await;
    for name in ["f1.bin", "f2.bin", "f3.bin"] {
        mount_slow_file(&server, &format!("/1/{name}"), Duration::from_millis(600)).await;
    }

    let root = tempfile::tempdir().unwrap();
    let config = parse_config(&format!(
        r#"
[crawler]
base-url = "{}/"

[download]
max-concurrency = 1
retries = 1
start-number = 1
save-root = "{}"
"#,
        server.uri(),
        root.path().display()
    ))
    .unwrap();

    let cancel = cancel_after(Duration::from_millis(300));
    let stats = harvest(&config, cancel).await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.next_number, 1);
    assert_eq!(stats.directories_completed, 0);
    assert_eq!(stats.files_downloaded, 1);
}

#[tokio::test]
async fn test_listing_failure_is_reported_separately() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/1/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_directory(&server, 2, &["z.txt"]).await;
    mount_file(&server, "/2/z.txt", b"zz".to_vec()).await;

    let root = tempfile::tempdir().unwrap();
    let config = parse_config(&format!(
        r#"
[crawler]
base-url = "{}/"

[download]
retries = 1
start-number = 1
max-consecutive-empty = 2
save-root = "{}"
"#,
        server.uri(),
        root.path().display()
    ))
    .unwrap();

    let stats = harvest(&config, CancellationFlag::new()).await.unwrap();

    assert_eq!(stats.directories_failed_listing, 1);
    assert_eq!(stats.directories_completed, 1);
    assert_eq!(stats.directories_absent, 2);
    assert_eq!(stats.files_downloaded, 1);
    assert_eq!(stats.next_number, 5);
}
