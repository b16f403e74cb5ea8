use anyhow::Context;
use tracing::info;

use super::upload::ImageUpload;
use crate::storage::ImageStorage;

/// Picks the image reference for a product write: an uploaded file is stored
/// and its reference returned, otherwise a non-blank `imageUrl` is used as
/// given. `None` means "no image supplied".
pub async fn resolve_image(
    storage: &dyn ImageStorage,
    upload: Option<ImageUpload>,
    image_url: Option<String>,
) -> anyhow::Result<Option<String>> {
    if let Some(upload) = upload {
        let size = upload.body.len();
        let reference = storage
            .put_image(upload.body, &upload.extension, &upload.content_type)
            .await
            .with_context(|| format!("store upload {}", upload.file_name))?;
        info!(backend = storage.backend(), %reference, bytes = size, "image stored");
        return Ok(Some(reference));
    }

    Ok(image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty()))
}
