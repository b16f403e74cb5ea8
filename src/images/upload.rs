use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};

use crate::error::AppError;

/// Multipart field that carries the product image.
pub const IMAGE_FIELD: &str = "image";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Body limit for routes that accept an upload: the image plus form fields.
pub const MULTIPART_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

const ALLOWED: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// An image that passed type and size validation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    /// Lowercased extension from the original file name.
    pub extension: String,
    pub body: Bytes,
}

/// Both the extension and the declared MIME type must name an allowed image
/// type. Returns the normalized extension.
pub fn validate_image_type(file_name: &str, content_type: &str) -> Result<String, AppError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED.contains(&ext.as_str()));
    let mime_ok = content_type
        .to_ascii_lowercase()
        .strip_prefix("image/")
        .is_some_and(|subtype| ALLOWED.contains(&subtype));

    match extension {
        Some(ext) if mime_ok => Ok(ext),
        _ => Err(AppError::validation("Only image files are allowed!")),
    }
}

pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::validation("File too large")
    } else {
        AppError::validation(format!("Upload error: {}", e.body_text()))
    }
}

/// Reads the image field. A file input submitted empty yields `None`.
pub async fn read_image_field(mut field: Field<'_>) -> Result<Option<ImageUpload>, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    if file_name.is_empty() {
        return Ok(None);
    }
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let extension = validate_image_type(&file_name, &content_type)?;

    let mut body = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if body.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(AppError::validation("File too large"));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Some(ImageUpload {
        file_name,
        content_type,
        extension,
        body: body.freeze(),
    }))
}
