use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::UploadedImage;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::ClientError;

const FALLBACK_FILE_NAME: &str = "image.png";

/// A file picked by the user, before validation.
#[derive(Debug, Clone)]
pub struct FileSelection {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Holds the most recently accepted image.
#[derive(Default)]
pub struct ImageIngestor {
    current: RwLock<Option<UploadedImage>>,
}

impl ImageIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `selection` and replaces the held image. A rejected selection
    /// leaves the previous image in place.
    pub async fn ingest(
        &self,
        selection: Option<FileSelection>,
    ) -> Result<UploadedImage, ClientError> {
        let Some(selection) = selection else {
            return Err(ClientError::Validation("no image selected".to_string()));
        };
        // Full decode is CPU bound; keep it off the async workers.
        let validated = tokio::task::spawn_blocking(move || uploaded_image_from_selection(selection))
            .await
            .map_err(|err| ClientError::Validation(format!("image validation aborted: {err}")))?;
        let image = match validated {
            Ok(image) => image,
            Err(err) => {
                warn!(error = %err, "rejected image selection");
                return Err(err);
            }
        };
        info!(
            file_name = image.file_name(),
            mime_type = image.mime_type(),
            size_bytes = image.size_bytes(),
            "image ingested"
        );
        *self.current.write().await = Some(image.clone());
        Ok(image)
    }

    pub async fn ingest_path(&self, path: &Path) -> Result<UploadedImage, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ClientError::Validation(format!("failed to read {}: {err}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        self.ingest(Some(FileSelection { file_name, bytes })).await
    }

    pub async fn current(&self) -> Option<UploadedImage> {
        self.current.read().await.clone()
    }

    pub async fn clear(&self) {
        self.current.write().await.take();
    }
}

fn uploaded_image_from_selection(selection: FileSelection) -> Result<UploadedImage, ClientError> {
    let FileSelection { file_name, bytes } = selection;
    if bytes.is_empty() {
        return Err(ClientError::Validation(format!("{file_name} is empty")));
    }
    let format = image::guess_format(&bytes).map_err(|err| {
        ClientError::Validation(format!("{file_name} is not a recognized image: {err}"))
    })?;
    image::load_from_memory_with_format(&bytes, format).map_err(|err| {
        ClientError::Validation(format!("{file_name} could not be decoded: {err}"))
    })?;

    let mime_type = format.to_mime_type();
    let preview_encoding = preview_data_url(mime_type, &bytes);
    Ok(UploadedImage::new(file_name, mime_type, bytes, preview_encoding))
}

/// `data:` URL carrying the untouched file bytes.
pub fn preview_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
#[path = "tests/ingest_tests.rs"]
mod tests;
