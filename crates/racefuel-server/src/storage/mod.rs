//! Blob store client
//!
//! GPX files live in an S3-compatible object store. Sagas talk to it through
//! the [`BlobStore`] trait so tests can swap in [`memory::InMemoryBlobStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub mod config;
pub mod memory;

/// Content type stored with every GPX object
pub const GPX_CONTENT_TYPE: &str = "application/gpx+xml";

/// Object store operations the ingestion sagas rely on
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write an object, replacing any existing one under the same key
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// Server-side copy; no bytes pass through this process
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Key of a catalog GPX upload: `catalog/{raceId}/{timestampMillis}-{nonce}.gpx`
///
/// The nonce keeps two uploads for the same race in the same millisecond
/// from overwriting each other.
pub fn catalog_gpx_key(race_id: Uuid, timestamp_millis: i64) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("catalog/{}/{}-{}.gpx", race_id, timestamp_millis, &nonce[..8])
}

/// Key of a plan's private GPX copy: `{userId}/{planId}.gpx`
pub fn plan_gpx_key(user_id: Uuid, plan_id: Uuid) -> String {
    format!("{}/{}.gpx", user_id, plan_id)
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub async fn new(config: config::StorageConfig) -> Result<Self> {
        debug!(
            endpoint = ?config.endpoint,
            region = %config.region,
            path_style = config.path_style,
            "Initializing blob store"
        );

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "racefuel-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Blob store client initialized");

        Ok(Self { client })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| format!("Failed to upload s3://{}/{}", bucket, key))?;

        info!("Uploaded s3://{}/{}", bucket, key);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        let copy_source = format!("{}/{}", source_bucket, source_key);

        self.client
            .copy_object()
            .bucket(dest_bucket)
            .copy_source(&copy_source)
            .key(dest_key)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to copy s3://{} to s3://{}/{}",
                    copy_source, dest_bucket, dest_key
                )
            })?;

        info!(
            "Copied s3://{}/{} to s3://{}/{}",
            source_bucket, source_key, dest_bucket, dest_key
        );

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete s3://{}/{}", bucket, key))?;

        info!("Deleted s3://{}/{}", bucket, key);

        Ok(())
    }
}
