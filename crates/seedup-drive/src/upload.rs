//! Resumable upload calls for Google Drive v3
//!
//! - [`create_resumable_session`] - Opens a session; its URI is the resume token
//! - [`upload_chunk`] - Sends one byte range with `Content-Range`
//! - [`session_status`] - Asks how many bytes a session holds
//!
//! Drive answers an accepted-but-incomplete request with `308 Resume
//! Incomplete` and a `Range: bytes=0-N` header naming the last stored byte.
//! The final request gets `200`/`201` with the file resource. A session URI
//! that returns `404`/`410` has expired and must be recreated.
//!
//! Reference: <https://developers.google.com/drive/api/guides/manage-uploads#resumable>

use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use seedup_core::ports::{ChunkAck, NewUpload, ObjectStoreError, ResumeToken, SessionState};

use crate::client::DriveClient;
use crate::{errors, mime};

const UPLOAD_PATH: &str = "/upload/drive/v3/files";

/// Status Drive uses for "more bytes expected"
const RESUME_INCOMPLETE: u16 = 308;

/// File resource returned on the final chunk
#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
    #[serde(default)]
    size: Option<String>,
}

/// Parses `bytes=0-N` into the number of stored bytes (`N + 1`)
fn parse_range_header(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes=")?;
    let (_, end) = range.split_once('-')?;
    end.trim().parse::<u64>().ok().map(|end| end + 1)
}

fn acknowledged_bytes(response: &Response) -> u64 {
    response
        .headers()
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
        .unwrap_or(0)
}

/// Reads the file resource of a finished upload
///
/// Drive omits `size` for some responses; the declared total is used then.
async fn completed(response: Response, total: u64) -> Result<(String, u64), ObjectStoreError> {
    let file: UploadedFile = response.json().await.map_err(errors::from_transport)?;
    let size = file
        .size
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(total);
    Ok((file.id, size))
}

fn is_expired(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

// ============================================================================
// create_resumable_session
// ============================================================================

/// Opens a resumable upload session
///
/// `POST /upload/drive/v3/files?uploadType=resumable` with the file
/// metadata as JSON. The session URI comes back in `Location`.
pub async fn create_resumable_session(
    client: &DriveClient,
    upload: &NewUpload,
) -> Result<ResumeToken, ObjectStoreError> {
    let mime_type = upload
        .mime_type
        .as_deref()
        .unwrap_or_else(|| mime::guess_mime_type(&upload.name));
    let metadata = serde_json::json!({
        "name": upload.name,
        "parents": [upload.folder_id],
    });

    let response = client
        .request(Method::POST, UPLOAD_PATH)
        .await?
        .query(&[
            ("uploadType", "resumable"),
            ("fields", "id,name,size"),
            ("supportsAllDrives", "true"),
        ])
        .header("X-Upload-Content-Type", mime_type)
        .header("X-Upload-Content-Length", upload.size.to_string())
        .json(&metadata)
        .send()
        .await
        .map_err(errors::from_transport)?;

    if !response.status().is_success() {
        return Err(errors::from_response(response).await);
    }

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            ObjectStoreError::InvalidResponse("resumable session without Location header".into())
        })?;

    debug!(name = %upload.name, size = upload.size, "Resumable session created");
    Ok(ResumeToken::new(location))
}

// ============================================================================
// upload_chunk
// ============================================================================

/// Sends `data` as bytes `offset..offset+len` of a `total`-byte upload
pub async fn upload_chunk(
    client: &DriveClient,
    token: &ResumeToken,
    offset: u64,
    data: &[u8],
    total: u64,
) -> Result<ChunkAck, ObjectStoreError> {
    let chunk_len = data.len() as u64;
    if chunk_len == 0 {
        return Err(ObjectStoreError::InvalidRequest("empty chunk".into()));
    }
    let content_range = format!("bytes {}-{}/{}", offset, offset + chunk_len - 1, total);
    debug!(content_range = %content_range, "Uploading chunk");

    let response = client
        .request_url(Method::PUT, token.as_str())
        .await?
        .header(CONTENT_RANGE, &content_range)
        .body(data.to_vec())
        .send()
        .await
        .map_err(errors::from_transport)?;

    let status = response.status();
    match status.as_u16() {
        RESUME_INCOMPLETE => {
            let acknowledged = acknowledged_bytes(&response);
            debug!(acknowledged, total, "Chunk stored");
            Ok(ChunkAck::Incomplete { acknowledged })
        }
        200 | 201 => {
            let (remote_id, size) = completed(response, total).await?;
            info!(remote_id = %remote_id, size, "Upload completed");
            Ok(ChunkAck::Complete { remote_id, size })
        }
        _ if is_expired(status) => Err(ObjectStoreError::SessionExpired),
        _ => Err(errors::from_response(response).await),
    }
}

// ============================================================================
// session_status
// ============================================================================

/// Queries a session with an empty `PUT` and `Content-Range: bytes */total`
pub async fn session_status(
    client: &DriveClient,
    token: &ResumeToken,
    total: u64,
) -> Result<SessionState, ObjectStoreError> {
    let response = client
        .request_url(Method::PUT, token.as_str())
        .await?
        .header(CONTENT_LENGTH, "0")
        .header(CONTENT_RANGE, format!("bytes */{total}"))
        .send()
        .await
        .map_err(errors::from_transport)?;

    let status = response.status();
    match status.as_u16() {
        RESUME_INCOMPLETE => Ok(SessionState::Active {
            acknowledged: acknowledged_bytes(&response),
        }),
        200 | 201 => {
            let (remote_id, size) = completed(response, total).await?;
            Ok(SessionState::Complete { remote_id, size })
        }
        _ if is_expired(status) => Ok(SessionState::Expired),
        _ => Err(errors::from_response(response).await),
    }
}
