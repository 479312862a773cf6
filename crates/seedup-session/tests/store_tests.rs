//! Integration tests for SqliteSessionStore
//!
//! Each test creates a fresh database (in-memory unless the test is about
//! files on disk).

use std::path::PathBuf;

use chrono::Utc;

use seedup_core::domain::{TaskId, TaskStatus, UploadError, UploadTask};
use seedup_core::ports::{ResumeToken, ResumeTokenStore, SessionRecord, SessionStore};
use seedup_session::{DatabasePool, SqliteSessionStore};

// ============================================================================
// Test helpers
// ============================================================================

async fn setup() -> SqliteSessionStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteSessionStore::new(pool.pool().clone())
}

fn record(path: &str, status: TaskStatus, attempts: u32) -> SessionRecord {
    SessionRecord {
        task_id: path.parse().unwrap(),
        status,
        attempts,
        last_error: None,
        remote_id: None,
        updated_at: Utc::now(),
    }
}

// ============================================================================
// SessionStore
// ============================================================================

#[tokio::test]
async fn test_load_empty_session() {
    let store = setup().await;
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let store = setup().await;

    let mut task = UploadTask::new(PathBuf::from("/data/a.mp4"), 1000, "folder").unwrap();
    task.start().unwrap();
    task.fail(&UploadError::Transient("connection reset".into()))
        .unwrap();
    store.save(&SessionRecord::from_task(&task)).await.unwrap();

    let loaded = store.load().await.unwrap();
    let rec = loaded.get(task.id()).expect("record present");
    assert_eq!(rec.status, TaskStatus::Failed { retryable: true });
    assert_eq!(rec.attempts, 1);
    assert!(rec.last_error.as_deref().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_save_replaces_previous_record() {
    let store = setup().await;
    store
        .save(&record("/data/a.mp4", TaskStatus::InProgress, 1))
        .await
        .unwrap();

    let mut done = record("/data/a.mp4", TaskStatus::Completed, 1);
    done.remote_id = Some("remote-1".into());
    store.save(&done).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    let rec = loaded.values().next().unwrap();
    assert_eq!(rec.status, TaskStatus::Completed);
    assert_eq!(rec.remote_id.as_deref(), Some("remote-1"));
}

#[tokio::test]
async fn test_clear_discards_records_and_tokens() {
    let store = setup().await;
    let id: TaskId = "/data/a.mp4".parse().unwrap();
    store
        .save(&record("/data/a.mp4", TaskStatus::Completed, 1))
        .await
        .unwrap();
    store
        .save_token(&id, "folder", &ResumeToken::new("https://upload/session"))
        .await
        .unwrap();

    store.clear().await.unwrap();

    assert!(store.load().await.unwrap().is_empty());
    assert!(store.load_token(&id, "folder").await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_rows_are_skipped() {
    let pool = DatabasePool::in_memory().await.unwrap();
    let store = SqliteSessionStore::new(pool.pool().clone());
    store
        .save(&record("/data/good.mp4", TaskStatus::Skipped, 0))
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO upload_tasks (task_id, status, attempts, updated_at) \
         VALUES ('/data/bad.mp4', 'exploded', 1, '2026-01-01T00:00:00Z')",
    )
    .execute(pool.pool())
    .await
    .unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key(&"/data/good.mp4".parse::<TaskId>().unwrap()));
}

#[tokio::test]
async fn test_count_by_status() {
    let store = setup().await;
    store
        .save(&record("/d/a", TaskStatus::Completed, 1))
        .await
        .unwrap();
    store
        .save(&record("/d/b", TaskStatus::Completed, 1))
        .await
        .unwrap();
    store
        .save(&record("/d/c", TaskStatus::Failed { retryable: false }, 2))
        .await
        .unwrap();

    let counts = store.count_by_status().await.unwrap();
    assert_eq!(counts.get("completed"), Some(&2));
    assert_eq!(counts.get("failed_permanent"), Some(&1));
}

// ============================================================================
// ResumeTokenStore
// ============================================================================

#[tokio::test]
async fn test_tokens_are_keyed_by_task_and_folder() {
    let store = setup().await;
    let id: TaskId = "/data/a.mp4".parse().unwrap();

    store
        .save_token(&id, "folder-1", &ResumeToken::new("session-1"))
        .await
        .unwrap();

    assert_eq!(
        store.load_token(&id, "folder-1").await.unwrap(),
        Some(ResumeToken::new("session-1"))
    );
    assert!(store.load_token(&id, "folder-2").await.unwrap().is_none());

    store.discard_token(&id, "folder-1").await.unwrap();
    assert!(store.load_token(&id, "folder-1").await.unwrap().is_none());
}

// ============================================================================
// Files on disk
// ============================================================================

#[tokio::test]
async fn test_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.db");

    {
        let store = SqliteSessionStore::open_or_reset(&path).await.unwrap();
        store
            .save(&record("/data/a.mp4", TaskStatus::Completed, 1))
            .await
            .unwrap();
    }

    let store = SqliteSessionStore::open_or_reset(&path).await.unwrap();
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn test_corrupt_database_is_moved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();

    let store = SqliteSessionStore::open_or_reset(&path).await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
    assert!(dir.path().join("session.db.corrupt").exists());
}
