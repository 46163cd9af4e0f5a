use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::error::DisplayErrorContext;
use s3::presigning::PresigningConfig;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Presigned upload URLs stay valid for 10 minutes.
const PRESIGN_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("presign configuration: {0}")]
    Presign(String),

    #[error("storage request failed: {0}")]
    Request(String),

    #[error("storage unavailable (simulated)")]
    Simulated,
}

/// StorageService
///
/// Object storage used for site branding (logo, favicon) and gallery media.
/// Keys are always relative to the configured bucket.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if missing. Only called in local mode (MinIO).
    async fn ensure_bucket_exists(&self);

    /// Signed PUT URL constrained to `content_type`.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, StorageError>;

    /// Stores `bytes` under `key` and returns the object's public URL.
    async fn upload_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Public URL an object under `key` is served from.
    fn public_url(&self, key: &str) -> String;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint. Path-style
/// addressing keeps it working against MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base_url: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_base_url: &str,
    ) -> Self {
        let credentials = s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self.client.create_bucket().bucket(&self.bucket_name).send().await {
            // BucketAlreadyOwnedByYou lands here on every restart.
            tracing::debug!(bucket = %self.bucket_name, "create_bucket: {}", DisplayErrorContext(&e));
        }
    }

    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL).map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn upload_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(self.public_url(&key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, sanitize_key(key))
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a caller-supplied key cannot escape
/// its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// An object captured by `MockStorageService::upload_object`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// MockStorageService
///
/// In-memory storage for tests. Presigned URLs and public URLs are
/// deterministic so handlers can be asserted against them.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    uploads: Arc<Mutex<Vec<StoredObject>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<StoredObject> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        Ok(format!("http://localhost:9000/mock-bucket/{}?signature=fake", sanitize_key(key)))
    }

    async fn upload_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        let key = sanitize_key(key);
        let mut uploads = self.uploads.lock().map_err(|_| StorageError::Simulated)?;
        uploads.push(StoredObject {
            key: key.clone(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(self.public_url(&key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://localhost:9000/mock-bucket/{}", sanitize_key(key))
    }
}

pub type StorageState = Arc<dyn StorageService>;
