use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::media::{ImageUpload, MediaError, MediaHost, UploadedAsset};

#[derive(Debug, thiserror::Error)]
pub enum SagaError<E> {
    #[error(transparent)]
    Acquire(MediaError),
    #[error(transparent)]
    Commit(E),
}

/// Upload-then-persist with a compensating delete.
///
/// `acquire` stores the image, the caller's commit step persists whatever
/// depends on it, and if that step fails `compensate` removes the image again
/// so no orphaned asset is left on the media host.
pub struct ImageSaga {
    media: Arc<dyn MediaHost>,
    folder: String,
}

impl ImageSaga {
    pub fn new(media: Arc<dyn MediaHost>, folder: impl Into<String>) -> Self {
        Self {
            media,
            folder: folder.into(),
        }
    }

    pub async fn acquire(&self, image: ImageUpload) -> Result<UploadedAsset, MediaError> {
        let asset = self.media.upload(image, &self.folder).await?;
        info!("Uploaded image {} to {}", asset.public_id, self.folder);
        Ok(asset)
    }

    /// Best effort: a failed delete is logged and otherwise ignored.
    pub async fn compensate(&self, asset: &UploadedAsset) {
        match self.media.destroy(&asset.public_id).await {
            Ok(()) => info!("Rolled back image {}", asset.public_id),
            Err(e) => warn!("Failed to clean up image {}: {}", asset.public_id, e),
        }
    }

    /// Acquires the image, then runs `commit`. A commit error triggers
    /// compensation and is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, image: ImageUpload, commit: F) -> Result<T, SagaError<E>>
    where
        F: FnOnce(UploadedAsset) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let asset = self.acquire(image).await.map_err(SagaError::Acquire)?;

        match commit(asset.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.compensate(&asset).await;
                Err(SagaError::Commit(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeHost {
        fail_upload: bool,
        fail_destroy: bool,
        destroyed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaHost for FakeHost {
        async fn upload(&self, _image: ImageUpload, folder: &str) -> Result<UploadedAsset, MediaError> {
            if self.fail_upload {
                return Err(MediaError::Upload("quota exceeded".into()));
            }
            Ok(UploadedAsset {
                secure_url: format!("https://cdn.example.com/{}/poster.png", folder),
                public_id: format!("{}/poster", folder),
            })
        }

        async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
            self.destroyed.lock().await.push(public_id.to_string());
            if self.fail_destroy {
                return Err(MediaError::Destroy("not found".into()));
            }
            Ok(())
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: Some("poster.png".into()),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[tokio::test]
    async fn test_commit_receives_asset() {
        let host = Arc::new(FakeHost::default());
        let saga = ImageSaga::new(host.clone(), "DevEvent");

        let url = saga
            .run(image(), |asset| async move { Ok::<_, String>(asset.secure_url) })
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/DevEvent/poster.png");
        assert!(host.destroyed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_compensates_once() {
        let host = Arc::new(FakeHost::default());
        let saga = ImageSaga::new(host.clone(), "DevEvent");

        let err = saga
            .run(image(), |_| async { Err::<(), _>("duplicate key".to_string()) })
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::Commit(ref e) if e == "duplicate key"));
        assert_eq!(*host.destroyed.lock().await, vec!["DevEvent/poster".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_commit_error() {
        let host = Arc::new(FakeHost { fail_destroy: true, ..Default::default() });
        let saga = ImageSaga::new(host.clone(), "DevEvent");

        let err = saga
            .run(image(), |_| async { Err::<(), _>("duplicate key".to_string()) })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "duplicate key");
        assert_eq!(host.destroyed.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_skips_commit() {
        let host = Arc::new(FakeHost { fail_upload: true, ..Default::default() });
        let saga = ImageSaga::new(host.clone(), "DevEvent");
        let mut committed = false;

        let err = saga
            .run(image(), |_| {
                committed = true;
                async { Ok::<_, String>(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::Acquire(MediaError::Upload(_))));
        assert!(!committed);
        assert!(host.destroyed.lock().await.is_empty());
    }
}
