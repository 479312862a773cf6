//! Shared helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns a `DriveObjectStore` pointing at it.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use seedup_drive::{DriveClient, DriveObjectStore, StaticTokenProvider};

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and a store configured against it
pub async fn setup_drive_mock() -> (MockServer, DriveObjectStore) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url(
        Arc::new(StaticTokenProvider::new(TEST_TOKEN)),
        server.uri(),
    )
    .expect("build client");
    (server, DriveObjectStore::new(client))
}

/// Absolute session URI served by the mock server
pub fn session_uri(server: &MockServer, id: &str) -> String {
    format!("{}/upload/session/{}", server.uri(), id)
}

/// Mounts `POST /upload/drive/v3/files` answering with a session URI
pub async fn mount_create_session(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Location", session_uri(server, session_id)),
        )
        .mount(server)
        .await;
}

/// Body of a Drive error response
pub fn drive_error(code: u16, reason: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{ "domain": "global", "reason": reason, "message": message }]
        }
    })
}
