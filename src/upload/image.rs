use std::path::Path;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Max evidence-photo size in the return flow (10 MB)
pub const MAX_RETURN_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Per-image upload lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error(String),
}

/// Client-generated id used to reconcile concurrent upload settlements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A locally attached image. `data` doubles as the preview reference;
/// it is freed when the image is removed or the owning form is dropped.
#[derive(Debug, Clone)]
pub struct AttachedImage {
    pub id: AttachmentId,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub status: UploadStatus,
    /// Storage key, set once the upload succeeded
    pub key: Option<String>,
    pub data: Bytes,
}

/// Validate and load a local file for attachment. Rejections happen
/// before any network call: the MIME type must be `image/*` and the size
/// must not exceed `max_bytes`.
pub fn load_image(path: &Path, max_bytes: u64) -> AppResult<AttachedImage> {
    let mime = mime_guess::from_path(path)
        .first()
        .ok_or_else(|| AppError::Validation("unsupported file type".to_string()))?;
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(AppError::Validation(format!(
            "not an image: detected type {}",
            mime
        )));
    }

    let size = std::fs::metadata(path)
        .map_err(|e| AppError::Validation(format!("cannot read file: {}", e)))?
        .len();
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "image exceeds size limit: {} > {} bytes",
            size, max_bytes
        )));
    }

    let data = std::fs::read(path)
        .map_err(|e| AppError::Validation(format!("cannot read file: {}", e)))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(AttachedImage {
        id: AttachmentId::new(),
        file_name,
        content_type: mime.essence_str().to_string(),
        size,
        status: UploadStatus::Pending,
        key: None,
        data: Bytes::from(data),
    })
}
