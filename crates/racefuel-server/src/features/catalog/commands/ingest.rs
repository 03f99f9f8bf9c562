//! Catalog ingestion saga
//!
//! Shared by the create and GPX-update commands:
//!
//! 1. validate the upload and parse it (no side effects)
//! 2. upload the raw bytes under `catalog/{raceId}/{timestamp}-{nonce}.gpx`
//! 3. hash the bytes
//! 4. insert or patch the catalog row with key, hash and course stats
//!
//! The blob is written strictly before the row that references it. If the
//! persist step fails the blob is deleted again, so a live row never points
//! at a missing object.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use racefuel_common::{
    checksum::sha256_hex,
    gpx::{CourseStats, GpxParseError, ParsedGpx},
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GpxConfig;
use crate::db::RecordStore;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::models::{CatalogGpxPatch, CatalogMetadata, CatalogRace, NewCatalogRace};
use crate::saga::{Saga, SagaStep};
use crate::storage::{catalog_gpx_key, BlobStore, GPX_CONTENT_TYPE};

/// Multipart field carrying the GPX file
pub const GPX_FIELD: &str = "gpx";

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("A GPX file is required in the '{}' field", GPX_FIELD)]
    MissingFile,

    #[error("The GPX file is empty")]
    EmptyFile,

    #[error("GPX file is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid GPX: {0}")]
    InvalidGpx(#[from] GpxParseError),

    #[error("Catalog race {0} not found")]
    NotFound(Uuid),

    #[error("Blob store request failed: {0:#}")]
    BlobStore(#[source] anyhow::Error),

    #[error("Record store request failed: {0:#}")]
    RecordStore(#[source] anyhow::Error),

    #[error("Ingestion aborted: {0}")]
    Aborted(String),
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::MissingFile
            | IngestionError::EmptyFile
            | IngestionError::FileTooLarge { .. }
            | IngestionError::InvalidMetadata(_) => AppError::Validation(err.to_string()),
            IngestionError::InvalidGpx(_) => AppError::UnprocessableGpx(err.to_string()),
            IngestionError::NotFound(_) => AppError::NotFound(err.to_string()),
            IngestionError::BlobStore(source) => {
                AppError::dependency("Failed to store the GPX file", source)
            },
            IngestionError::RecordStore(source) => {
                AppError::dependency("Failed to save the catalog race", source)
            },
            IngestionError::Aborted(message) => AppError::Internal(message),
        }
    }
}

/// Upload that passed validation and parsing
#[derive(Debug, Clone)]
pub struct ValidatedGpx {
    pub bytes: Vec<u8>,
    pub parsed: ParsedGpx,
}

/// Check presence and size, then parse with the configured threshold
pub fn validate_upload(
    upload: Option<Vec<u8>>,
    config: &GpxConfig,
) -> Result<ValidatedGpx, IngestionError> {
    let bytes = upload.ok_or(IngestionError::MissingFile)?;

    if bytes.is_empty() {
        return Err(IngestionError::EmptyFile);
    }
    if bytes.len() > config.max_upload_bytes {
        return Err(IngestionError::FileTooLarge {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        });
    }

    let parsed = config.parser().parse_bytes(&bytes)?;
    debug!(
        points = parsed.points.len(),
        waypoints = parsed.waypoints.len(),
        distance_km = parsed.stats.distance_km,
        "GPX upload parsed"
    );

    Ok(ValidatedGpx { bytes, parsed })
}

/// What the persist step does with the catalog row
#[derive(Debug, Clone)]
pub enum IngestMode {
    Create(CatalogMetadata),
    /// Conditional patch keyed by race id
    Update,
}

struct IngestContext {
    race_id: Uuid,
    mode: IngestMode,
    bucket: String,
    key: String,
    bytes: Vec<u8>,
    stats: CourseStats,
    hash: Option<String>,
    record: Option<CatalogRace>,
}

struct UploadGpxBlob {
    blobs: Arc<dyn BlobStore>,
}

#[async_trait]
impl SagaStep<IngestContext, IngestionError> for UploadGpxBlob {
    fn name(&self) -> &'static str {
        "upload_gpx_blob"
    }

    async fn execute(&self, ctx: &mut IngestContext) -> Result<(), IngestionError> {
        self.blobs
            .put(&ctx.bucket, &ctx.key, ctx.bytes.clone(), GPX_CONTENT_TYPE)
            .await
            .map_err(IngestionError::BlobStore)?;
        debug!(race_id = %ctx.race_id, key = %ctx.key, "Catalog GPX uploaded");
        Ok(())
    }

    async fn compensate(&self, ctx: &IngestContext) -> anyhow::Result<()> {
        info!(race_id = %ctx.race_id, key = %ctx.key, "Removing unreferenced catalog GPX");
        self.blobs.delete(&ctx.bucket, &ctx.key).await
    }
}

struct HashGpxContent;

#[async_trait]
impl SagaStep<IngestContext, IngestionError> for HashGpxContent {
    fn name(&self) -> &'static str {
        "hash_gpx_content"
    }

    async fn execute(&self, ctx: &mut IngestContext) -> Result<(), IngestionError> {
        ctx.hash = Some(sha256_hex(&ctx.bytes));
        Ok(())
    }
}

struct PersistCatalogRecord {
    records: Arc<dyn RecordStore>,
}

#[async_trait]
impl SagaStep<IngestContext, IngestionError> for PersistCatalogRecord {
    fn name(&self) -> &'static str {
        "persist_catalog_record"
    }

    async fn execute(&self, ctx: &mut IngestContext) -> Result<(), IngestionError> {
        let gpx_hash = ctx.hash.clone().unwrap_or_else(|| sha256_hex(&ctx.bytes));

        let record = match &ctx.mode {
            IngestMode::Create(metadata) => {
                let race = NewCatalogRace {
                    id: ctx.race_id,
                    metadata: metadata.clone(),
                    gpx_path: ctx.key.clone(),
                    gpx_hash,
                    stats: ctx.stats.clone(),
                };
                self.records
                    .insert_catalog_race(&race)
                    .await
                    .map_err(IngestionError::RecordStore)?
            },
            IngestMode::Update => {
                let patch = CatalogGpxPatch {
                    gpx_path: ctx.key.clone(),
                    gpx_hash,
                    stats: ctx.stats.clone(),
                };
                self.records
                    .patch_catalog_race_gpx(ctx.race_id, &patch)
                    .await
                    .map_err(IngestionError::RecordStore)?
                    .ok_or(IngestionError::NotFound(ctx.race_id))?
            },
        };

        ctx.record = Some(record);
        Ok(())
    }
}

/// Run the upload → hash → persist saga for an already validated upload
#[tracing::instrument(skip(state, mode, gpx), fields(key = tracing::field::Empty))]
pub async fn run(
    state: &FeatureState,
    race_id: Uuid,
    mode: IngestMode,
    gpx: ValidatedGpx,
) -> Result<CatalogRace, IngestionError> {
    let key = catalog_gpx_key(race_id, Utc::now().timestamp_millis());
    tracing::Span::current().record("key", key.as_str());

    let context = IngestContext {
        race_id,
        mode,
        bucket: state.gpx.catalog_bucket.clone(),
        key,
        bytes: gpx.bytes,
        stats: gpx.parsed.stats,
        hash: None,
        record: None,
    };

    let saga = Saga::new("catalog_ingestion")
        .step(UploadGpxBlob {
            blobs: Arc::clone(&state.blobs),
        })
        .step(HashGpxContent)
        .step(PersistCatalogRecord {
            records: Arc::clone(&state.records),
        });

    let context = saga
        .run_detached(context)
        .await
        .map_err(|e| IngestionError::Aborted(format!("ingestion task failed: {}", e)))??;

    context
        .record
        .ok_or_else(|| IngestionError::Aborted("saga finished without a record".to_string()))
}
