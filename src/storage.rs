//! Object storage: ordered page images in, ordered URIs out.
//!
//! The ordering contract is the whole point of this interface. Downstream,
//! page numbers are assigned from the position of each URI in the returned
//! set, so output URI *i* must correspond to input image *i*. The S3
//! implementation uploads sequentially to keep that guarantee trivially true
//! rather than re-sorting after a concurrent scatter.

use crate::error::PipelineError;
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Durable storage for an ordered set of page images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store every page image and return one URI per page, in input order.
    ///
    /// Implementations must be atomic from the caller's perspective: on
    /// `Err` the caller treats the whole set as unstored.
    async fn store_pages(
        &self,
        pages: &[Vec<u8>],
        content_type: &str,
    ) -> Result<Vec<String>, PipelineError>;
}

/// S3-backed [`ObjectStorage`].
///
/// Keys are laid out as `{prefix}{YYYY-MM-DD}/{uuid}.{ext}` and each stored
/// object is returned as a presigned GET URL so the report template can
/// embed the images without public-bucket ACLs.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    signed_ttl_secs: u64,
}

impl S3Storage {
    /// Build a client from the ambient AWS environment (region, credentials).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
            prefix: "uploads/".to_string(),
            signed_ttl_secs: 3600,
        }
    }

    /// Use a pre-built client, e.g. one pointed at an S3-compatible store.
    pub fn with_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: "uploads/".to_string(),
            signed_ttl_secs: 3600,
        }
    }

    /// Override the key prefix (default `uploads/`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override the presigned-URL lifetime (default 3600 s).
    pub fn signed_ttl_secs(mut self, secs: u64) -> Self {
        self.signed_ttl_secs = secs;
        self
    }

    fn object_key(&self, content_type: &str) -> String {
        let ext = match content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            _ => "bin",
        };
        let date = chrono::Utc::now().format("%Y-%m-%d");
        format!("{}{}/{}.{}", self.prefix, date, Uuid::new_v4(), ext)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn store_pages(
        &self,
        pages: &[Vec<u8>],
        content_type: &str,
    ) -> Result<Vec<String>, PipelineError> {
        info!(
            "uploading {} page images to s3://{}/{}",
            pages.len(),
            self.bucket,
            self.prefix
        );

        let mut urls = Vec::with_capacity(pages.len());

        for (i, page) in pages.iter().enumerate() {
            let key = self.object_key(content_type);
            debug!("uploading page {}/{} as {}", i + 1, pages.len(), key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(ByteStream::from(page.clone()))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| PipelineError::Storage {
                    detail: format!("put_object failed for page {}: {}", i + 1, e),
                })?;

            let presigning = PresigningConfig::expires_in(Duration::from_secs(
                self.signed_ttl_secs,
            ))
            .map_err(|e| PipelineError::Storage {
                detail: format!("presigning config: {e}"),
            })?;

            let presigned = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(|e| PipelineError::Storage {
                    detail: format!("presign failed for page {}: {}", i + 1, e),
                })?;

            urls.push(presigned.uri().to_string());
        }

        info!("uploaded {} page images", urls.len());
        Ok(urls)
    }
}
