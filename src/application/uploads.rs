use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// An image received from a form, ready to forward to object storage.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub secure_url: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file was provided")]
    Empty,
    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("only image uploads are accepted, got `{0}`")]
    NotAnImage(String),
    #[error("image storage rejected the upload: {0}")]
    Rejected(String),
    #[error("image storage request failed: {0}")]
    Transport(String),
    #[error("image storage is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store_image(&self, upload: ImageUpload) -> Result<StoredImage, UploadError>;
}

/// Validates form uploads before they leave the service. A failure here never
/// touches any post; callers clear the image field and carry on.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ImageStore>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(store: Arc<dyn ImageStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    #[tracing::instrument(
        skip(self, upload),
        fields(file_name = %upload.file_name, size = upload.data.len())
    )]
    pub async fn upload_image(&self, mut upload: ImageUpload) -> Result<StoredImage, UploadError> {
        if upload.data.is_empty() {
            return Err(UploadError::Empty);
        }
        if upload.data.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: upload.data.len(),
                limit: self.max_bytes,
            });
        }

        let content_type = upload
            .content_type
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&upload.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        if !content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage(content_type));
        }
        upload.content_type = Some(content_type);

        match self.store.store_image(upload).await {
            Ok(stored) => {
                info!(url = %stored.secure_url, "image stored");
                Ok(stored)
            }
            Err(err) => {
                warn!(error = %err, "image upload failed");
                Err(err)
            }
        }
    }
}
