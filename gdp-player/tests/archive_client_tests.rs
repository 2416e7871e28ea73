//! Integration tests for the archive.org client against the mock archive

mod helpers;

use gdp_player::archive::{AudioFileEntry, ArchiveError};
use helpers::*;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_search_returns_identifiers_in_order() {
    let server = MockArchive::new()
        .with_show("gd1977-05-08", json!({}))
        .with_show("gd1972-08-27", json!({}))
        .start()
        .await;

    let shows = archive_client(&server.base_url)
        .search_shows("Dark Star")
        .await
        .unwrap();

    assert_eq!(shows, vec!["gd1977-05-08", "gd1972-08-27"]);
    assert_eq!(server.requests(), vec!["search:grateful dead Dark Star"]);
}

#[tokio::test]
async fn test_malformed_search_response_is_parse_error() {
    let server = MockArchive::new()
        .with_raw_search_body(r#"{"error": "search engine unavailable"}"#)
        .start()
        .await;

    let result = archive_client(&server.base_url).search_shows("Dark Star").await;
    assert!(matches!(result, Err(ArchiveError::Parse(_))));
}

#[tokio::test]
async fn test_fetch_show_metadata() {
    let server = MockArchive::new()
        .with_show(
            "gd1977-05-08",
            show_metadata(
                "1977-05-08",
                "Barton Hall",
                "Grateful Dead",
                &[("d1t01.mp3", "VBR MP3"), ("d1t01.flac", "Flac")],
            ),
        )
        .start()
        .await;

    let metadata = archive_client(&server.base_url)
        .fetch_show_metadata("gd1977-05-08")
        .await
        .unwrap();

    assert_eq!(metadata.files.len(), 2);
    assert_eq!(metadata.files[1].format, "Flac");
    assert_eq!(metadata.metadata.date(), Some("1977-05-08"));
    assert_eq!(metadata.metadata.title(), Some("Barton Hall"));
    assert_eq!(metadata.metadata.creator(), Some("Grateful Dead"));
}

#[tokio::test]
async fn test_metadata_server_error_is_api_error() {
    let server = MockArchive::new().with_broken_show("gd-broken").start().await;

    let result = archive_client(&server.base_url)
        .fetch_show_metadata("gd-broken")
        .await;
    assert!(matches!(result, Err(ArchiveError::Api(500, _))));
}

#[tokio::test]
async fn test_download_writes_file() {
    let name = "gd77-05-08d2t04 Scarlet Begonias.mp3";
    let server = MockArchive::new()
        .with_file("gd1977-05-08", name, b"0123456789")
        .start()
        .await;
    let dir = TempDir::new().unwrap();
    let entry = AudioFileEntry {
        name: name.to_string(),
        format: "VBR MP3".to_string(),
    };

    let path = archive_client(&server.base_url)
        .download_file("gd1977-05-08", &entry, dir.path())
        .await
        .unwrap();

    assert_eq!(path, dir.path().join(name));
    assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
    assert_eq!(
        server.requests(),
        vec![format!("download:gd1977-05-08/{}", name)]
    );
}

#[tokio::test]
async fn test_download_into_nested_folder_keeps_base_name() {
    let server = MockArchive::new()
        .with_file("gd1977-05-08", "disc2/t04.mp3", b"abc")
        .start()
        .await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("not-yet-created");
    let entry = AudioFileEntry {
        name: "disc2/t04.mp3".to_string(),
        format: "VBR MP3".to_string(),
    };

    let path = archive_client(&server.base_url)
        .download_file("gd1977-05-08", &entry, &target)
        .await
        .unwrap();

    assert_eq!(path, target.join("t04.mp3"));
    assert_eq!(std::fs::read(&path).unwrap(), b"abc");
}

#[tokio::test]
async fn test_download_missing_file_leaves_nothing_behind() {
    let server = MockArchive::new().start().await;
    let dir = TempDir::new().unwrap();
    let entry = AudioFileEntry {
        name: "missing.mp3".to_string(),
        format: "VBR MP3".to_string(),
    };

    let result = archive_client(&server.base_url)
        .download_file("gd1977-05-08", &entry, dir.path())
        .await;

    assert!(matches!(result, Err(ArchiveError::Api(404, _))));
    assert!(!dir.path().join("missing.mp3").exists());
}
