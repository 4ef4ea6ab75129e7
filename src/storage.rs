use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{compression::extension_of, models::UploadKind};

/// Lifetime of every presigned URL (10 minutes).
pub const PRESIGN_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Contract for the object store holding document and digital asset files. The
/// API never proxies file bytes; clients upload and download through presigned URLs.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Signed PUT URL constrained to `content_type`.
    async fn presigned_upload_url(&self, key: &str, content_type: &str)
    -> Result<String, String>;

    /// Signed GET URL for an existing object.
    async fn presigned_download_url(&self, key: &str) -> Result<String, String>;
}

/// S3StorageClient
///
/// `aws-sdk-s3` client for any S3-compatible endpoint (MinIO locally). Path-style
/// addressing is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

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
        }
    }

    fn presigning() -> Result<PresigningConfig, String> {
        PresigningConfig::expires_in(PRESIGN_TTL).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => tracing::info!(bucket = %self.bucket_name, "created storage bucket"),
            // Already exists, or the store is unreachable; uploads will surface the latter.
            Err(e) => tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped"),
        }
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning()?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned.uri().to_string())
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(Self::presigning()?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments from a client-supplied key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Server-chosen object key: `<prefix>/<uuid>[.<ext>]`. The client filename only
/// contributes its extension.
pub fn object_key(kind: UploadKind, filename: &str) -> String {
    let ext = extension_of(filename)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()) && ext.len() <= 10);
    match ext {
        Some(ext) => format!("{}/{}.{}", kind.key_prefix(), Uuid::new_v4(), ext),
        None => format!("{}/{}", kind.key_prefix(), Uuid::new_v4()),
    }
}

/// MockStorageService
///
/// Deterministic `StorageService` for tests; no network access.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake&op=get",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle to the storage service held in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
