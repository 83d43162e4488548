use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gdc_slide_fetcher::domain::FileId;
use gdc_slide_fetcher::error::FetchError;
use gdc_slide_fetcher::gdc::{GdcClient, GdcHttpClient, RetryPolicy};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    }
}

fn dest_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, dir)
}

fn dir_entries(dir: &Utf8PathBuf) -> usize {
    std::fs::read_dir(dir.as_std_path()).unwrap().count()
}

#[test]
fn download_stores_body_under_portal_filename() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/data/abc123")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("Content-Disposition", "attachment; filename=slide.svs")
        .with_body("slide bytes")
        .expect(1)
        .create();

    let (_temp, dir) = dest_dir();
    let client = GdcHttpClient::new(&server.url())
        .unwrap()
        .with_retry_policy(fast_retry());
    let id: FileId = "abc123".parse().unwrap();

    let downloaded = client.download_file(&id, &dir).unwrap();
    assert_eq!(downloaded.filename, "slide.svs");
    assert_eq!(downloaded.path, dir.join("slide.svs"));

    let content = std::fs::read(downloaded.path.as_std_path()).unwrap();
    assert_eq!(content, b"slide bytes");
    mock.assert();
}

#[test]
fn transient_statuses_are_retried_until_success() {
    let mut server = mockito::Server::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let transient = {
        let hits = Arc::clone(&hits);
        server
            .mock("GET", "/data/abc123")
            .match_request(move |_| {
                let seen = hits.load(Ordering::SeqCst);
                if seen < 2 {
                    hits.store(seen + 1, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            })
            .with_status(503)
            .expect(2)
            .create()
    };
    let ok = {
        let hits = Arc::clone(&hits);
        server
            .mock("GET", "/data/abc123")
            .match_request(move |_| hits.load(Ordering::SeqCst) >= 2)
            .with_status(200)
            .with_header("Content-Disposition", "attachment; filename=slide.svs")
            .with_body("slide bytes")
            .expect(1)
            .create()
    };

    let (_temp, dir) = dest_dir();
    let client = GdcHttpClient::new(&server.url())
        .unwrap()
        .with_retry_policy(fast_retry());
    let id: FileId = "abc123".parse().unwrap();

    let downloaded = client.download_file(&id, &dir).unwrap();
    assert_eq!(downloaded.filename, "slide.svs");
    transient.assert();
    ok.assert();
}

#[test]
fn retry_exhaustion_creates_no_file() {
    let mut server = mockito::Server::new();
    // max_retries = 2 gives one initial attempt plus two retries.
    let mock = server
        .mock("GET", "/data/abc123")
        .with_status(503)
        .expect(3)
        .create();

    let (_temp, dir) = dest_dir();
    let client = GdcHttpClient::new(&server.url())
        .unwrap()
        .with_retry_policy(fast_retry());
    let id: FileId = "abc123".parse().unwrap();

    let err = client.download_file(&id, &dir).unwrap_err();
    assert_matches!(err, FetchError::GdcStatus { status: 503, .. });
    assert_eq!(dir_entries(&dir), 0);
    mock.assert();
}

#[test]
fn client_errors_are_not_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/data/abc123")
        .with_status(404)
        .with_body("no such file")
        .expect(1)
        .create();

    let (_temp, dir) = dest_dir();
    let client = GdcHttpClient::new(&server.url())
        .unwrap()
        .with_retry_policy(fast_retry());
    let id: FileId = "abc123".parse().unwrap();

    let err = client.download_file(&id, &dir).unwrap_err();
    assert_matches!(err, FetchError::GdcStatus { status: 404, .. });
    assert_eq!(dir_entries(&dir), 0);
    mock.assert();
}

#[test]
fn missing_content_disposition_creates_no_file() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/data/abc123")
        .with_status(200)
        .with_body("slide bytes")
        .create();

    let (_temp, dir) = dest_dir();
    let client = GdcHttpClient::new(&server.url())
        .unwrap()
        .with_retry_policy(fast_retry());
    let id: FileId = "abc123".parse().unwrap();

    let err = client.download_file(&id, &dir).unwrap_err();
    assert_matches!(err, FetchError::MissingFilename(id) if id == "abc123");
    assert_eq!(dir_entries(&dir), 0);
}
