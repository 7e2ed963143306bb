//! Integration tests for the mirror
//!
//! These tests use wiremock to serve synthetic directory listings and files,
//! and check the resulting local tree end-to-end.

use index_mirror::config::{
    BackoffStrategy, Config, CrawlerConfig, MirrorConfig, RetryConfig, UserAgentConfig,
};
use index_mirror::crawler::Mirror;
use index_mirror::RunSummary;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration mirroring `root_url` into `destination`
fn create_test_config(root_url: &str, destination: &Path) -> Config {
    Config {
        mirror: MirrorConfig {
            root_url: root_url.to_string(),
            destination: destination.to_path_buf(),
        },
        crawler: CrawlerConfig {
            max_concurrent_requests: 4,
            request_timeout: 5,
            connect_timeout: 5,
            show_progress: false,
        },
        retry: RetryConfig {
            max_attempts: 3,
            backoff: 10, // Very short for testing
            strategy: BackoffStrategy::Fixed,
            max_backoff: 10,
        },
        user_agent: UserAgentConfig::default(),
    }
}

/// Renders an Apache-style index page listing `entries`
fn listing(title: &str, entries: &[&str]) -> String {
    let rows: String = entries
        .iter()
        .map(|e| format!("<tr><td><a href=\"{}\">{}</a></td></tr>\n", e, e))
        .collect();

    format!(
        r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<html><head><title>Index of {title}</title></head><body>
<h1>Index of {title}</h1>
<table>
<tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th>
<th><a href="?C=S;O=A">Size</a></th><th><a href="?C=D;O=A">Description</a></th></tr>
<tr><td><a href="../">Parent Directory</a></td></tr>
{rows}</table></body></html>"#
    )
}

async fn mount_listing(server: &MockServer, dir: &str, entries: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path(dir))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(dir, entries))
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(file))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Lists every file under `root` as a sorted, `/`-separated relative path
fn collect_files(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).expect("Failed to read dir") {
            let entry = entry.expect("Failed to read entry");
            let path = entry.path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let relative = path.strip_prefix(root).expect("Path outside root");
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }

    let mut files = Vec::new();
    walk(root, root, &mut files);
    files.sort();
    files
}

/// Serves hand-written HTTP/1.1 responses for bodies wiremock cannot
/// produce: ones that trickle in, stall, or end before their `Content-Length`
///
/// Each connection carries one request. `handler` receives the request path
/// and the connection. Returns the server's base URI.
async fn start_raw_server<F, Fut>(handler: F) -> String
where
    F: Fn(String, TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind raw server");
    let addr = listener.local_addr().expect("No local address");
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.set_nodelay(true);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Some(path) = read_request_path(&mut stream).await {
                    (*handler)(path, stream).await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

async fn write_head(stream: &mut TcpStream, status: &str, content_length: usize) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, content_length
    );
    let _ = stream.write_all(head.as_bytes()).await;
}

async fn write_body(mut stream: TcpStream, status: &str, body: &str) {
    write_head(&mut stream, status, body.len()).await;
    let _ = stream.write_all(body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn run(config: Config) -> RunSummary {
    let mut mirror = Mirror::new(config).expect("Failed to create mirror");
    mirror.run().await.expect("Mirror failed")
}

#[tokio::test]
async fn test_mirrors_nested_tree() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["sub/", "a.txt"], 1).await;
    mount_listing(&mock_server, "/A/sub/", &["b.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;
    mount_file(&mock_server, "/A/sub/b.txt", "bravo", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["a.txt", "sub/b.txt"]);
    assert_eq!(
        std::fs::read_to_string(dest.path().join("a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        std::fs::read_to_string(dest.path().join("sub/b.txt")).unwrap(),
        "bravo"
    );

    assert_eq!(summary.directories_entered, 2);
    assert_eq!(summary.files_downloaded, 2);
    assert_eq!(summary.bytes_downloaded, 10);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_existing_file_is_not_requested() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();
    std::fs::write(dest.path().join("a.txt"), "local copy").unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt", "c.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "remote copy", 0).await;
    mount_file(&mock_server, "/A/c.txt", "charlie", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(
        std::fs::read_to_string(dest.path().join("a.txt")).unwrap(),
        "local copy"
    );
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_downloaded, 1);
}

#[tokio::test]
async fn test_empty_local_file_is_downloaded_again() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();
    std::fs::write(dest.path().join("a.txt"), "").unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(
        std::fs::read_to_string(dest.path().join("a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(summary.files_downloaded, 1);
}

#[tokio::test]
async fn test_failing_file_is_retried_then_skipped() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["sub/", "a.txt"], 1).await;
    mount_listing(&mock_server, "/A/sub/", &["b.txt"], 1).await;
    mount_file(&mock_server, "/A/sub/b.txt", "bravo", 1).await;

    Mock::given(method("GET"))
        .and(path("/A/a.txt"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    // Neither the file nor a partial leftover may exist
    assert!(!dest.path().join("a.txt").exists());
    assert!(!dest.path().join("a.txt.part").exists());
    assert_eq!(collect_files(dest.path()), vec!["sub/b.txt"]);

    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_downloaded, 1);
    assert!(summary.has_failures());
}

#[tokio::test]
async fn test_cyclic_listings_are_entered_once() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    // Root links to itself; sub links back to the root and to itself
    mount_listing(&mock_server, "/A/", &["sub/", "/A/", "./"], 1).await;
    mount_listing(&mock_server, "/A/sub/", &["/A/", "/A/sub/", "../", "b.txt"], 1).await;
    mount_file(&mock_server, "/A/sub/b.txt", "bravo", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(summary.directories_entered, 2);
    assert_eq!(collect_files(dest.path()), vec!["sub/b.txt"]);
}

#[tokio::test]
async fn test_file_linked_twice_is_downloaded_once() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt", "sub/"], 1).await;
    mount_listing(&mock_server, "/A/sub/", &["/A/a.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(summary.files_downloaded, 1);
    assert_eq!(collect_files(dest.path()), vec!["a.txt"]);
}

#[tokio::test]
async fn test_out_of_scope_links_are_ignored() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    let outside = format!("{}/B/y.txt", mock_server.uri());
    mount_listing(
        &mock_server,
        "/A/",
        &["/", "/B/", "/B/x.txt", "/AB/z.txt", outside.as_str(), "a.txt"],
        1,
    )
    .await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;

    for forbidden in ["/", "/B/", "/B/x.txt", "/B/y.txt", "/AB/z.txt"] {
        Mock::given(method("GET"))
            .and(path(forbidden))
            .respond_with(ResponseTemplate::new(200).set_body_string("nope"))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["a.txt"]);
    assert_eq!(summary.links_discovered, 1);
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["sub/", "a.txt"], 2).await;
    mount_listing(&mock_server, "/A/sub/", &["b.txt"], 2).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;
    mount_file(&mock_server, "/A/sub/b.txt", "bravo", 1).await;

    let root = format!("{}/A/", mock_server.uri());

    let first = run(create_test_config(&root, dest.path())).await;
    assert_eq!(first.files_downloaded, 2);

    let second = run(create_test_config(&root, dest.path())).await;
    assert_eq!(second.files_downloaded, 0);
    assert_eq!(second.files_skipped, 2);
    assert!(second.is_complete());
}

#[tokio::test]
async fn test_unreachable_directory_is_not_fatal() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["broken/", "a.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;

    Mock::given(method("GET"))
        .and(path("/A/broken/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["a.txt"]);
    assert_eq!(summary.listing_failures, 1);
    assert_eq!(summary.directories_entered, 2);
    assert!(summary.has_failures());
}

#[tokio::test]
async fn test_percent_encoded_names_are_decoded_locally() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["my%20dir/"], 1).await;
    mount_listing(&mock_server, "/A/my%20dir/", &["read%20me.txt"], 1).await;
    mount_file(&mock_server, "/A/my%20dir/read%20me.txt", "hello", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["my dir/read me.txt"]);
}

#[tokio::test]
async fn test_stale_partial_file_is_replaced() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();
    std::fs::write(dest.path().join("a.txt.part"), "truncated garbage").unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["a.txt"]);
    assert_eq!(
        std::fs::read_to_string(dest.path().join("a.txt")).unwrap(),
        "alpha"
    );
}

#[tokio::test]
async fn test_cancelled_run_fetches_nothing() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt"], 0).await;

    let root = format!("{}/A/", mock_server.uri());
    let mut mirror =
        Mirror::new(create_test_config(&root, dest.path())).expect("Failed to create mirror");
    mirror.cancellation_token().cancel();

    let summary = mirror.run().await.expect("Mirror failed");
    assert!(summary.cancelled);
    assert!(!summary.is_complete());
    assert_eq!(summary.directories_entered, 0);
    assert!(collect_files(dest.path()).is_empty());
}

#[tokio::test]
async fn test_single_worker_mirrors_whole_tree() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["x/", "y/", "top.bin"], 1).await;
    mount_listing(&mock_server, "/A/x/", &["deep/", "x1.txt"], 1).await;
    mount_listing(&mock_server, "/A/x/deep/", &["d.txt"], 1).await;
    mount_listing(&mock_server, "/A/y/", &[], 1).await;
    mount_file(&mock_server, "/A/top.bin", "0101", 1).await;
    mount_file(&mock_server, "/A/x/x1.txt", "x1", 1).await;
    mount_file(&mock_server, "/A/x/deep/d.txt", "d", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let mut config = create_test_config(&root, dest.path());
    config.crawler.max_concurrent_requests = 1;
    let summary = run(config).await;

    assert_eq!(
        collect_files(dest.path()),
        vec!["top.bin", "x/deep/d.txt", "x/x1.txt"]
    );
    assert_eq!(summary.directories_entered, 4);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_encoded_hash_in_name_is_a_distinct_file() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    mount_listing(&mock_server, "/A/", &["a%231.txt", "a%232.txt"], 1).await;
    mount_file(&mock_server, "/A/a%231.txt", "one", 1).await;
    mount_file(&mock_server, "/A/a%232.txt", "two", 1).await;

    Mock::given(method("GET"))
        .and(path("/A/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("wrong"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(collect_files(dest.path()), vec!["a#1.txt", "a#2.txt"]);
    assert_eq!(
        std::fs::read_to_string(dest.path().join("a#2.txt")).unwrap(),
        "two"
    );
    assert_eq!(summary.files_downloaded, 2);
}

#[tokio::test]
async fn test_slow_steady_download_completes() {
    let dest = TempDir::new().unwrap();

    // Ten bytes, one every 300ms: three times the request timeout in total,
    // but never idle for longer than it
    let base = start_raw_server(|path, mut stream| async move {
        match path.as_str() {
            "/A/" => write_body(stream, "200 OK", &listing("/A/", &["slow.bin"])).await,
            "/A/slow.bin" => {
                write_head(&mut stream, "200 OK", 10).await;
                for _ in 0..10 {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    if stream.write_all(b"x").await.is_err() {
                        return;
                    }
                }
            }
            _ => write_body(stream, "404 Not Found", "").await,
        }
    })
    .await;

    let mut config = create_test_config(&format!("{}/A/", base), dest.path());
    config.crawler.request_timeout = 1;
    let summary = run(config).await;

    assert_eq!(summary.files_downloaded, 1);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(
        std::fs::read(dest.path().join("slow.bin")).unwrap(),
        b"xxxxxxxxxx"
    );
}

#[tokio::test]
async fn test_stalled_download_times_out_and_is_retried() {
    let dest = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&attempts);
    let base = start_raw_server(move |path, mut stream| {
        let counter = Arc::clone(&counter);
        async move {
            match path.as_str() {
                "/A/" => write_body(stream, "200 OK", &listing("/A/", &["stuck.bin"])).await,
                "/A/stuck.bin" => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    write_head(&mut stream, "200 OK", 10).await;
                    let _ = stream.write_all(b"xx").await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                _ => write_body(stream, "404 Not Found", "").await,
            }
        }
    })
    .await;

    let mut config = create_test_config(&format!("{}/A/", base), dest.path());
    config.crawler.request_timeout = 1;
    let summary = run(config).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(summary.files_failed, 1);
    assert!(!dest.path().join("stuck.bin").exists());
    assert!(!dest.path().join("stuck.bin.part").exists());
}

#[tokio::test]
async fn test_truncated_body_is_retried_and_partial_removed() {
    let dest = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&attempts);
    let base = start_raw_server(move |path, mut stream| {
        let counter = Arc::clone(&counter);
        async move {
            match path.as_str() {
                "/A/" => {
                    write_body(stream, "200 OK", &listing("/A/", &["short.bin", "b.txt"])).await
                }
                "/A/b.txt" => write_body(stream, "200 OK", "bravo").await,
                "/A/short.bin" => {
                    // Promise ten bytes, deliver four, hang up
                    counter.fetch_add(1, Ordering::SeqCst);
                    write_head(&mut stream, "200 OK", 10).await;
                    let _ = stream.write_all(b"xxxx").await;
                    let _ = stream.shutdown().await;
                }
                _ => write_body(stream, "404 Not Found", "").await,
            }
        }
    })
    .await;

    let summary = run(create_test_config(&format!("{}/A/", base), dest.path())).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(!dest.path().join("short.bin").exists());
    assert!(!dest.path().join("short.bin.part").exists());
    assert_eq!(collect_files(dest.path()), vec!["b.txt"]);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_downloaded, 1);
}

#[tokio::test]
async fn test_unwritable_destination_fails_without_retry() {
    let mock_server = MockServer::start().await;
    let dest = TempDir::new().unwrap();

    // A directory already occupies the file's final path
    std::fs::create_dir(dest.path().join("a.txt")).unwrap();

    mount_listing(&mock_server, "/A/", &["a.txt", "b.txt"], 1).await;
    mount_file(&mock_server, "/A/a.txt", "alpha", 1).await;
    mount_file(&mock_server, "/A/b.txt", "bravo", 1).await;

    let root = format!("{}/A/", mock_server.uri());
    let summary = run(create_test_config(&root, dest.path())).await;

    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_downloaded, 1);
    assert!(dest.path().join("a.txt").is_dir());
    assert!(!dest.path().join("a.txt.part").exists());
    assert_eq!(collect_files(dest.path()), vec!["b.txt"]);
}
