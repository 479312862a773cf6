//! Folder listing and folder creation
//!
//! - [`list_folder`] - Pages through `files.list` for one parent
//! - [`find_folder`] - Looks up a child folder by name
//! - [`create_folder`] - Creates a child folder
//! - [`find_or_create_folder`] - The two above combined

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use seedup_core::ports::ObjectStoreError;

use crate::client::DriveClient;
use crate::errors;

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FILES_PATH: &str = "/drive/v3/files";

const PAGE_SIZE: &str = "1000";

/// A `files` entry of a `files.list` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Drive encodes int64 as a JSON string; Google-native docs have none
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Size in bytes, if the entry is a binary file
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Escapes a value for use inside a single-quoted Drive query string
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

async fn list_query(client: &DriveClient, q: &str) -> Result<Vec<DriveFile>, ObjectStoreError> {
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query: Vec<(&str, &str)> = vec![
            ("q", q),
            ("fields", "nextPageToken,files(id,name,size,mimeType)"),
            ("pageSize", PAGE_SIZE),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }

        let response = client
            .request(Method::GET, FILES_PATH)
            .await?
            .query(&query)
            .send()
            .await
            .map_err(errors::from_transport)?;

        if !response.status().is_success() {
            return Err(errors::from_response(response).await);
        }

        let page: FileListResponse = response.json().await.map_err(errors::from_transport)?;
        debug!(count = page.files.len(), "Fetched files.list page");
        files.extend(page.files);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(files)
}

/// Lists every non-trashed child of `folder_id`, folders included
pub async fn list_folder(
    client: &DriveClient,
    folder_id: &str,
) -> Result<Vec<DriveFile>, ObjectStoreError> {
    let q = format!("'{}' in parents and trashed=false", escape_query(folder_id));
    let files = list_query(client, &q).await?;
    debug!(folder_id, count = files.len(), "Listed folder");
    Ok(files)
}

/// Returns the id of the first folder named `name` under `parent_id`
pub async fn find_folder(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<Option<String>, ObjectStoreError> {
    let q = format!(
        "name = '{}' and '{}' in parents and mimeType = '{}' and trashed=false",
        escape_query(name),
        escape_query(parent_id),
        FOLDER_MIME_TYPE
    );
    Ok(list_query(client, &q).await?.into_iter().next().map(|f| f.id))
}

/// Creates a folder named `name` under `parent_id`
pub async fn create_folder(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<String, ObjectStoreError> {
    let body = serde_json::json!({
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
        "parents": [parent_id],
    });

    let response = client
        .request(Method::POST, FILES_PATH)
        .await?
        .query(&[("fields", "id"), ("supportsAllDrives", "true")])
        .json(&body)
        .send()
        .await
        .map_err(errors::from_transport)?;

    if !response.status().is_success() {
        return Err(errors::from_response(response).await);
    }

    let created: CreatedFile = response.json().await.map_err(errors::from_transport)?;
    info!(name, parent_id, folder_id = %created.id, "Created Drive folder");
    Ok(created.id)
}

/// Resolves a child folder by name, creating it when absent
pub async fn find_or_create_folder(
    client: &DriveClient,
    name: &str,
    parent_id: &str,
) -> Result<String, ObjectStoreError> {
    match find_folder(client, name, parent_id).await? {
        Some(id) => {
            debug!(name, parent_id, folder_id = %id, "Found existing Drive folder");
            Ok(id)
        }
        None => create_folder(client, name, parent_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("it's"), "it\\'s");
        assert_eq!(escape_query("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_drive_file_size_parsing() {
        let json = r#"{"id":"1","name":"a.mp4","size":"1000","mimeType":"video/mp4"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.size_bytes(), Some(1000));
        assert!(!file.is_folder());

        let json = r#"{"id":"2","name":"dir","mimeType":"application/vnd.google-apps.folder"}"#;
        let folder: DriveFile = serde_json::from_str(json).unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.size_bytes(), None);
    }
}
