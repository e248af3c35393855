//! Client for the Supabase-compatible object store holding job artifacts.
//!
//! Generated media lives under `jobs/{job_id}/...` in a single public bucket.
//! Hosted model outputs are mirrored from their temporary CDN URLs into the
//! bucket so results outlive the provider's retention window.

use std::path::Path;

/// Bucket used for all generated assets.
pub const DEFAULT_BUCKET: &str = "system-assets";

/// Errors from the object storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The storage API returned a non-2xx status code.
    #[error("storage API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Reading or writing a local scratch file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for one storage endpoint and bucket.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            service_key,
            bucket,
        }
    }

    /// Public URL for an object path, whether or not it exists yet.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    /// Upload raw bytes to `path` in the bucket. Returns the public URL.
    pub async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("apikey", self.service_key.clone())
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(self.public_url(path))
    }

    /// Upload a local file to `path` in the bucket. Returns the public URL.
    pub async fn upload_file(
        &self,
        path: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let data = tokio::fs::read(local_path).await?;
        self.upload(path, data, content_type).await
    }

    /// Mirror a remote URL (typically a model provider's CDN) into the
    /// bucket at `path`. Returns the public URL of the mirrored copy.
    pub async fn upload_from_url(&self, path: &str, url: &str) -> Result<String, StorageError> {
        let (data, content_type) = self.fetch(url).await?;
        self.upload(path, data, &content_type).await
    }

    /// Download a URL to a local scratch file.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<(), StorageError> {
        let (data, _) = self.fetch(url).await?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    /// Fetch a URL, returning its bytes and content type.
    pub async fn fetch(&self, url: &str) -> Result<(Vec<u8>, String), StorageError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = resp.bytes().await?.to_vec();
        Ok((data, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let client = StorageClient::new(
            "https://proj.supabase.co".into(),
            "service-key".into(),
            DEFAULT_BUCKET.into(),
        );
        assert_eq!(
            client.public_url("jobs/abc/final_ad.mp4"),
            "https://proj.supabase.co/storage/v1/object/public/system-assets/jobs/abc/final_ad.mp4"
        );
    }
}
