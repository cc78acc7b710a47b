use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::constants::EXPORT_CONTENT_TYPE;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BlobError {
    #[error("no such key: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("blob store error: {0}")]
    Service(String),
    #[error("object s3://{bucket}/{key} is not valid UTF-8")]
    InvalidUtf8 { bucket: String, key: String },
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Whole-object get/put view of the blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object as UTF-8 text. A missing object is `BlobError::NotFound`.
    async fn get_text(&self, bucket: &str, key: &str) -> Result<String, BlobError>;

    /// Replace the object wholesale.
    async fn put_text(&self, bucket: &str, key: &str, body: String) -> Result<(), BlobError>;
}

/// S3 backed store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build from shared AWS config. Custom endpoints (LocalStack) need path-style addressing.
    pub fn from_conf(config: &aws_config::SdkConfig, force_path_style: bool) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(config)
            .force_path_style(force_path_style)
            .build();
        Self::new(Client::from_conf(s3_config))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get_text(&self, bucket: &str, key: &str) -> Result<String, BlobError> {
        tracing::debug!(bucket, key, "Downloading object from S3");

        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key())
                {
                    return Err(BlobError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                return Err(BlobError::Service(format!(
                    "failed to download s3://{bucket}/{key}: {}",
                    DisplayErrorContext(&err)
                )));
            }
        };

        let bytes = output.body.collect().await.map_err(|e| {
            BlobError::Service(format!("failed to read body for s3://{bucket}/{key}: {e}"))
        })?;

        String::from_utf8(bytes.into_bytes().to_vec()).map_err(|_| BlobError::InvalidUtf8 {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_text(&self, bucket: &str, key: &str, body: String) -> Result<(), BlobError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(EXPORT_CONTENT_TYPE)
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await
            .map_err(|e| {
                BlobError::Service(format!(
                    "failed to upload s3://{bucket}/{key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        tracing::trace!(bucket, key, size, "Uploaded object");
        Ok(())
    }
}
