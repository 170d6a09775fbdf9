use async_trait::async_trait;
use chrono::Utc;
use devevent_domain::media::{ImageUpload, MediaError, MediaHost, UploadedAsset};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::info;

use crate::app_config::MediaConfig;

/// Cloudinary signed-upload client.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: &MediaConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cloud_name, action)
    }

    /// Hex SHA-256 over `k=v` pairs sorted by key, joined with `&`, followed
    /// by the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => format!("{}: {}", status, parsed.error.message),
            Err(_) => format!("{}: {}", status, body),
        }
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<UploadedAsset, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let mut part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.unwrap_or_else(|| "upload".to_string()));
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| MediaError::Upload(e.to_string()))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::Upload(Self::error_message(response).await));
        }

        let asset: UploadedAsset = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;
        info!("Cloudinary upload stored as {}", asset.public_id);
        Ok(asset)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Destroy(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::Destroy(Self::error_message(response).await));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Destroy(e.to_string()))?;
        if body.result != "ok" {
            return Err(MediaError::Destroy(format!("{}: {}", public_id, body.result)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_base: &str) -> CloudinaryClient {
        CloudinaryClient::new(&MediaConfig {
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: "abcd".into(),
            folder: "DevEvent".into(),
            api_base: api_base.into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: Some("poster.png".into()),
            content_type: Some("image/png".into()),
            // Text bytes, so body matchers can read the multipart payload.
            bytes: Bytes::from_static(b"poster-bytes"),
        }
    }

    #[test]
    fn test_signature_sorts_params_and_appends_secret() {
        let client = client("http://localhost");
        let expected = "de487d079e12f748cbd432a1fb9309a9dd3b85c201f181bce1421f608c62286a";

        assert_eq!(client.sign(&[("timestamp", "1315060510"), ("folder", "DevEvent")]), expected);
        assert_eq!(client.sign(&[("folder", "DevEvent"), ("timestamp", "1315060510")]), expected);
    }

    #[tokio::test]
    async fn test_upload_returns_asset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .and(body_string_contains("DevEvent"))
            .and(body_string_contains("poster-bytes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "DevEvent/poster",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/DevEvent/poster.png",
                "bytes": 6
            })))
            .expect(1)
            .mount(&server)
            .await;

        let asset = client(&server.uri()).upload(image(), "DevEvent").await.unwrap();
        assert_eq!(asset.public_id, "DevEvent/poster");
        assert!(asset.secure_url.starts_with("https://"));
    }

    #[tokio::test]
    async fn test_upload_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).upload(image(), "DevEvent").await.unwrap_err();
        assert!(matches!(err, MediaError::Upload(_)));
        assert!(err.to_string().contains("Invalid Signature"));
    }

    #[tokio::test]
    async fn test_destroy_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/destroy"))
            .and(body_string_contains("public_id=DevEvent%2Fposter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri()).destroy("DevEvent/poster").await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_not_found_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/destroy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "not found" })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).destroy("DevEvent/missing").await.unwrap_err();
        assert!(matches!(err, MediaError::Destroy(_)));
        assert!(err.to_string().contains("not found"));
    }
}
