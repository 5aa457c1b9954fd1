//! Image storage over the object store's unsigned multipart upload API.

use async_trait::async_trait;
use reqwest::{
    Client, Url,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::uploads::{ImageStore, ImageUpload, StoredImage, UploadError};
use crate::config::UploadSettings;
use crate::infra::error::InfraError;

#[derive(Clone, Debug)]
pub struct HttpImageStore {
    client: Client,
    endpoint: Url,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpImageStore {
    pub fn new(base: &Url, cloud_name: &str, upload_preset: String) -> Result<Self, InfraError> {
        let endpoint = base
            .join(&format!("v1_1/{cloud_name}/image/upload"))
            .map_err(|err| InfraError::client("uploads", err.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("peaklife/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::client("uploads", err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            upload_preset,
        })
    }

    /// `None` when the cloud name or upload preset is missing.
    pub fn from_settings(settings: &UploadSettings) -> Result<Option<Self>, InfraError> {
        match (
            settings.cloud_name.as_deref(),
            settings.upload_preset.as_ref(),
        ) {
            (Some(cloud), Some(preset)) => {
                Self::new(&settings.base_url, cloud, preset.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn store_image(&self, upload: ImageUpload) -> Result<StoredImage, UploadError> {
        let mut part = Part::bytes(upload.data.to_vec()).file_name(upload.file_name.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|err| UploadError::NotAnImage(err.to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        debug!(endpoint = %self.endpoint, "uploading image");
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            warn!(%status, message = %message, "image store rejected upload");
            return Err(UploadError::Rejected(format!("status {status}: {message}")));
        }

        let body: UploadResponse = serde_json::from_slice(&bytes)
            .map_err(|err| UploadError::Transport(format!("failed to parse body: {err}")))?;
        Ok(StoredImage {
            secure_url: body.secure_url,
        })
    }
}

/// Stand-in used when no object store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn store_image(&self, _upload: ImageUpload) -> Result<StoredImage, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;

    #[test]
    fn endpoint_targets_the_cloud_image_upload() {
        let base = Url::parse("https://api.cloudinary.com").unwrap();
        let store = HttpImageStore::new(&base, "peaklife", "unsigned".to_string()).unwrap();
        assert_eq!(
            store.endpoint().as_str(),
            "https://api.cloudinary.com/v1_1/peaklife/image/upload"
        );
    }

    #[test]
    fn missing_preset_yields_no_store() {
        let settings = UploadSettings {
            base_url: Url::parse("https://api.cloudinary.com").unwrap(),
            cloud_name: Some("peaklife".to_string()),
            upload_preset: None,
            max_request_bytes: NonZeroU64::new(1024).unwrap(),
        };
        assert!(HttpImageStore::from_settings(&settings).unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_store_reports_not_configured() {
        let upload = ImageUpload {
            file_name: "a.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: bytes::Bytes::from_static(b"png"),
        };
        assert!(matches!(
            DisabledImageStore.store_image(upload).await,
            Err(UploadError::NotConfigured)
        ));
    }
}
