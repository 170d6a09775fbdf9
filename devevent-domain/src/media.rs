use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Raw image bytes as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// What the media host hands back for a stored asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Image upload failed: {0}")]
    Upload(String),
    #[error("Image deletion failed: {0}")]
    Destroy(String),
}

/// Third-party image storage.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<UploadedAsset, MediaError>;

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}
