//! Avatar file storage under the upload directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// URL prefix the upload directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Where avatars go inside the upload directory.
const AVATAR_SUBDIR: &str = "avatars";

/// A file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedUpload {
    pub path: PathBuf,
    pub url: String,
}

/// An uploaded avatar as received from a multipart field.
pub struct AvatarFile<'a> {
    pub content_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// File extension (with dot) from the client's file name, else the MIME
/// subtype.
fn extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let ext = from_name.or_else(|| {
        content_type
            .split('/')
            .nth(1)
            .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub).trim())
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|sub| if sub == "jpeg" { "jpg".to_string() } else { sub.to_string() })
    });

    ext.map(|e| format!(".{}", e)).unwrap_or_default()
}

/// Check and store an avatar as `avatars/avatar-<uuid><ext>`.
pub async fn save_avatar(
    upload_dir: &Path,
    file: AvatarFile<'_>,
    max_bytes: usize,
) -> ApiResult<SavedUpload> {
    let content_type = file.content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("Only image files are allowed!"));
    }
    if file.bytes.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }
    if file.bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    let name = format!(
        "avatar-{}{}",
        Uuid::new_v4(),
        extension(file.file_name, content_type)
    );
    let dir = upload_dir.join(AVATAR_SUBDIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create {}: {}", dir.display(), e)))?;

    let path = dir.join(&name);
    tokio::fs::write(&path, file.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

    debug!(path = %path.display(), bytes = file.bytes.len(), "Avatar stored");
    Ok(SavedUpload {
        path,
        url: format!("{}/{}/{}", UPLOADS_URL_PREFIX, AVATAR_SUBDIR, name),
    })
}

pub fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "Image size should be less than {}MB",
        max_bytes / (1024 * 1024)
    ))
}

/// Resolve a URL we served from the upload directory back to its file.
/// Remote URLs and anything escaping the directory give `None`.
pub fn local_path(upload_dir: &Path, url: &str) -> Option<PathBuf> {
    let relative = url.strip_prefix(UPLOADS_URL_PREFIX)?.strip_prefix('/')?;
    if relative.is_empty()
        || relative
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return None;
    }
    Some(upload_dir.join(relative))
}

/// Delete a previously uploaded file. Missing files are fine.
pub async fn remove_local(upload_dir: &Path, url: &str) {
    let Some(path) = local_path(upload_dir, url) else {
        return;
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(path = %path.display(), "Removed old upload"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old upload"),
    }
}
