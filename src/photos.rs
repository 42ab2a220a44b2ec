use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::PhotoError;

const BLOB_PREFIX: &str = "blob:planti/";

/// Media type declared by a file's extension.
pub fn media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Hands out references to attached photo files. The references only mean
/// something to the session that issued them; nothing is copied or kept
/// once the session is dropped.
#[derive(Debug, Default)]
pub struct PhotoSession {
    files: HashMap<String, PathBuf>,
}

impl PhotoSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, file: impl AsRef<Path>) -> Result<String, PhotoError> {
        let file = file.as_ref();
        if !file.is_file() {
            return Err(PhotoError::NotFound(file.display().to_string()));
        }
        let declared = media_type(file);
        if !declared.starts_with("image/") {
            return Err(PhotoError::NotAnImage(declared.to_string()));
        }

        let url = format!("{BLOB_PREFIX}{}", Uuid::new_v4());
        tracing::debug!(%url, file = %file.display(), "Attached photo");
        self.files.insert(url.clone(), file.to_path_buf());
        Ok(url)
    }

    pub fn resolve(&self, url: &str) -> Option<&Path> {
        self.files.get(url).map(PathBuf::as_path)
    }

    /// Whether `url` is a session reference rather than a durable link.
    pub fn is_session_reference(url: &str) -> bool {
        url.starts_with(BLOB_PREFIX)
    }
}
