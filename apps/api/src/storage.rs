use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },
}

/// Object storage for avatars, task attachments and signed contract PDFs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` and returns the public URL.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, StorageError>;
}

/// S3 / MinIO bucket.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String, endpoint: &str) -> Self {
        let public_base = format!("{}/{}", endpoint.trim_end_matches('/'), bucket);
        Self {
            client,
            bucket,
            public_base,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Keeps uploads in memory. Used by tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: tokio::sync::Mutex<Vec<(String, Bytes, String)>>,
}

#[cfg(test)]
impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .await
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .await
            .push((key.to_string(), body, content_type.to_string()));
        Ok(format!("memory://{key}"))
    }
}
