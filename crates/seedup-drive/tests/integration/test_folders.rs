//! Folder listing and folder creation against a mock Drive API

use std::sync::Arc;

use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use seedup_core::ports::{CloudObjectStore, ObjectStoreError};
use seedup_drive::{DriveClient, DriveObjectStore, EnvTokenProvider};

use crate::common;

#[tokio::test]
async fn test_list_files_follows_pages_and_drops_folders() {
    let (server, store) = common::setup_drive_mock().await;

    // Second page first: mocks mounted earlier win when several match
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                { "id": "f3", "name": "c.srt", "size": "42", "mimeType": "application/x-subrip" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'folder-1' in parents and trashed=false"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nextPageToken": "page-2",
            "files": [
                { "id": "f1", "name": "a.mp4", "size": "1000", "mimeType": "video/mp4" },
                { "id": "d1", "name": "Extras", "mimeType": "application/vnd.google-apps.folder" },
                { "id": "g1", "name": "Notes", "mimeType": "application/vnd.google-apps.document" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut files = store.list_files("folder-1").await.expect("list files");
    files.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "a.mp4");
    assert_eq!(files[0].size, 1000);
    assert_eq!(files[0].remote_id, "f1");
    assert_eq!(files[1].name, "c.srt");
}

#[tokio::test]
async fn test_ensure_folder_returns_existing() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                { "id": "existing-dir", "name": "Season 1", "mimeType": "application/vnd.google-apps.folder" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let id = store.ensure_folder("Season 1", "parent").await.unwrap();
    assert_eq!(id, "existing-dir");
}

#[tokio::test]
async fn test_ensure_folder_creates_missing() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_partial_json(serde_json::json!({
            "name": "SeedUp Downloads",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "new-dir" })))
        .expect(1)
        .mount(&server)
        .await;

    let id = store.default_folder("SeedUp Downloads").await.unwrap();
    assert_eq!(id, "new-dir");
}

#[tokio::test]
async fn test_list_unknown_folder_is_not_found() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(common::drive_error(
                404,
                "notFound",
                "File not found: folder-x.",
            )),
        )
        .mount(&server)
        .await;

    let err = store.list_files("folder-x").await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::NotFound(ref m) if m.contains("folder-x")));
}

#[tokio::test]
async fn test_missing_credential_fails_without_request() {
    let (server, _) = common::setup_drive_mock().await;
    let client = DriveClient::with_base_url(
        Arc::new(EnvTokenProvider::new(["SEEDUP_DRIVE_TEST_UNSET_TOKEN"])),
        server.uri(),
    )
    .unwrap();
    let store = DriveObjectStore::new(client);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store.list_files("root").await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::Unauthorized(_)));
}
