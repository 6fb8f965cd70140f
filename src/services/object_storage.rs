// ============================================================================
// OBJECT STORAGE (Cloudinary upload API)
// ============================================================================
//
// Endpoints used:
//   - POST {base}/v1_1/{cloud}/image/upload   multipart, returns secure_url + public_id
//   - POST {base}/v1_1/{cloud}/image/destroy  form, {"result": "ok" | "not found"}
//
// Both requests are signed: SHA-256 hex of the sorted `key=value` params
// joined by '&', followed by the API secret.
//
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;

/// An asset stored by [`ObjectStorage::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<UploadedAsset, StorageError>;
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}

pub struct CloudinaryStorage {
    client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryStorage {
    pub fn new(config: &CloudinaryConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    async fn rejection(response: reqwest::Response) -> StorageError {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => StorageError::Rejected(format!("{}: {}", status, body.error.message)),
            Err(_) => StorageError::Rejected(status.to_string()),
        }
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<UploadedAsset, StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("folder", folder), ("timestamp", timestamp.as_str())], &self.api_secret);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name("upload"))
            .text("api_key", self.api_key.clone())
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self.client.post(self.endpoint("upload")).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: UploadResponse = response.json().await?;
        Ok(UploadedAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())], &self.api_secret);

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature_algorithm", "sha256"),
            ("signature", signature.as_str()),
        ];
        let response = self.client.post(self.endpoint("destroy")).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Rejected(other.to_string())),
        }
    }
}

/// Request signature: params sorted by name, `k=v` joined with '&', secret appended.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let payload = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{}{}", payload, secret).as_bytes()))
}

/// Records uploads and deletes instead of calling a remote service.
#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeStorage {
        fail_upload_at: Option<usize>,
        fail_deletes: bool,
        attempts: Mutex<usize>,
        uploaded: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeStorage {
        /// Fails the `n`-th upload attempt (1-based).
        pub fn failing_upload(n: usize) -> Self {
            Self {
                fail_upload_at: Some(n),
                ..Default::default()
            }
        }

        pub fn failing_deletes() -> Self {
            Self {
                fail_deletes: true,
                ..Default::default()
            }
        }

        pub fn uploaded(&self) -> Vec<String> {
            self.uploaded.lock().unwrap().clone()
        }

        pub fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn upload(&self, _bytes: Vec<u8>, folder: &str) -> Result<UploadedAsset, StorageError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts
            };
            if self.fail_upload_at == Some(attempt) {
                return Err(StorageError::Rejected("simulated upload failure".to_string()));
            }

            let public_id = format!("{}/asset-{}", folder, attempt);
            self.uploaded.lock().unwrap().push(public_id.clone());
            Ok(UploadedAsset {
                url: format!("https://cdn.test/{}.jpg", public_id),
                public_id,
            })
        }

        async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
            if self.fail_deletes {
                return Err(StorageError::Rejected("simulated delete failure".to_string()));
            }
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }
}
