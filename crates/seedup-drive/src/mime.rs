//! MIME type guessing from file extensions

use std::path::Path;

/// Fallback for unknown extensions
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guesses a MIME type from the extension of `name`
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        Some("zip") => "application/zip",
        Some("gz" | "tgz") => "application/gzip",
        Some("7z") => "application/x-7z-compressed",
        Some("rar") => "application/vnd.rar",
        Some("iso") => "application/x-iso9660-image",
        Some("torrent") => "application/x-bittorrent",
        Some("txt" | "nfo") => "text/plain",
        Some("srt") => "application/x-subrip",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        _ => DEFAULT_MIME_TYPE,
    }
}
