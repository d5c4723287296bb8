// service/storage.rs
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{config::StorageConfig, service::error::ServiceError};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` at `path` and returns a publicly readable URL.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, ServiceError>;
}

/// Bucket storage over the REST object API (`/storage/v1/object/{bucket}/{path}`).
pub struct HttpObjectStorage {
    config: StorageConfig,
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(config: StorageConfig, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for storage: {}", e);
                reqwest::Client::new()
            });

        Self { config, client }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket,
            path
        )
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        if self.config.url.is_empty() {
            return Err(ServiceError::ExternalService(
                "Object storage is not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket,
            path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header("Content-Type", content_type)
            .header("Cache-Control", "3600")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalService(format!(
                "Upload rejected with status {}",
                response.status()
            )));
        }

        Ok(self.public_url(path))
    }
}

/// Decodes a base64 photo, with or without a `data:image/...;base64,` prefix.
pub fn decode_photo(encoded: &str) -> Result<Vec<u8>, ServiceError> {
    let data = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:image/") => rest,
        _ => encoded,
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| ServiceError::Validation(format!("Invalid photo encoding: {}", e)))
}
