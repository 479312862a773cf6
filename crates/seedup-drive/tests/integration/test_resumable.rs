//! Resumable upload protocol against a mock Drive API

use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use seedup_core::ports::{ChunkAck, CloudObjectStore, NewUpload, ObjectStoreError, ResumeToken, SessionState};

use crate::common;

fn new_upload() -> NewUpload {
    NewUpload {
        name: "a.mp4".into(),
        folder_id: "folder-1".into(),
        size: 10,
        mime_type: Some("video/mp4".into()),
    }
}

#[tokio::test]
async fn test_create_session_returns_location() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("X-Upload-Content-Length", "10"))
        .and(header("X-Upload-Content-Type", "video/mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", common::session_uri(&server, "s1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = store.create_resumable_session(&new_upload()).await.unwrap();
    assert_eq!(token.as_str(), common::session_uri(&server, "s1"));
}

#[tokio::test]
async fn test_create_session_without_location_is_invalid() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = store.create_resumable_session(&new_upload()).await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_chunks_until_complete() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_create_session(&server, "s2").await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s2"))
        .and(header("Content-Range", "bytes 0-3/10"))
        .and(body_bytes(b"0123".to_vec()))
        .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-3"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s2"))
        .and(header("Content-Range", "bytes 4-9/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-1",
            "name": "a.mp4",
            "size": "10"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = store.create_resumable_session(&new_upload()).await.unwrap();
    let data = b"0123456789";

    let ack = store.upload_chunk(&token, 0, &data[..4], 10).await.unwrap();
    assert_eq!(ack, ChunkAck::Incomplete { acknowledged: 4 });

    let ack = store.upload_chunk(&token, 4, &data[4..], 10).await.unwrap();
    assert_eq!(
        ack,
        ChunkAck::Complete {
            remote_id: "file-1".into(),
            size: 10
        }
    );
}

#[tokio::test]
async fn test_partial_acknowledgement_is_reported() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s3"))
        .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-1"))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "s3"));
    let ack = store.upload_chunk(&token, 0, b"0123", 10).await.unwrap();
    assert_eq!(ack, ChunkAck::Incomplete { acknowledged: 2 });
}

#[tokio::test]
async fn test_session_status_reports_offset() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s4"))
        .and(header("Content-Range", "bytes */10"))
        .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-5"))
        .expect(1)
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "s4"));
    let state = store.session_status(&token, 10).await.unwrap();
    assert_eq!(state, SessionState::Active { acknowledged: 6 });
}

#[tokio::test]
async fn test_session_status_without_range_means_nothing_stored() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s5"))
        .respond_with(ResponseTemplate::new(308))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "s5"));
    let state = store.session_status(&token, 10).await.unwrap();
    assert_eq!(state, SessionState::Active { acknowledged: 0 });
}

#[tokio::test]
async fn test_expired_session() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "gone"));
    assert_eq!(
        store.session_status(&token, 10).await.unwrap(),
        SessionState::Expired
    );
    let err = store.upload_chunk(&token, 0, b"0123", 10).await.unwrap_err();
    assert_eq!(err, ObjectStoreError::SessionExpired);
}

#[tokio::test]
async fn test_quota_exceeded_is_permanent() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/full"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::drive_error(
            403,
            "storageQuotaExceeded",
            "The user's Drive storage quota has been exceeded.",
        )))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "full"));
    let err = store.upload_chunk(&token, 0, b"0123", 10).await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::QuotaExceeded(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "flaky"));
    let err = store.upload_chunk(&token, 0, b"0123", 10).await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::Server { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let token = ResumeToken::new(common::session_uri(&server, "busy"));
    let err = store.upload_chunk(&token, 0, b"0123", 10).await.unwrap_err();
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(7)));
}

#[tokio::test]
async fn test_create_session_guesses_content_type() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(header("X-Upload-Content-Type", "video/x-matroska"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", common::session_uri(&server, "s2")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let upload = NewUpload::new("episode.mkv", "folder-1", 10);
    let token = store.create_resumable_session(&upload).await.unwrap();
    assert_eq!(token.as_str(), common::session_uri(&server, "s2"));
}
