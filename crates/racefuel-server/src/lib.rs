//! Racefuel Server Library
//!
//! HTTP service behind the race-fueling planner's GPX workflows.
//!
//! # Overview
//!
//! - **Catalog ingestion**: admins upload a race GPX; it is parsed, stored in
//!   the blob store, fingerprinted and recorded with its course statistics
//! - **Catalog import**: users copy a catalog race (GPX object, stats and aid
//!   stations) into a plan of their own
//! - **Staleness**: plans remember which catalog revision they came from
//!
//! # Architecture
//!
//! Both workflows span two stores with no shared transaction, so each runs as
//! a [`saga::Saga`]: an ordered list of steps whose completed effects are
//! undone in reverse when a later step fails.
//!
//! - [`storage::BlobStore`]: S3-compatible object store (`aws-sdk-s3`)
//! - [`db::RecordStore`]: PostgreSQL (`sqlx`)
//! - [`features`]: vertical slices with `commands/`, `queries/` and `routes.rs`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use racefuel_server::{
//!     api, config::Config, db, features::{plans::RecordCountQuota, FeatureState},
//!     storage::{config::StorageConfig, S3BlobStore},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     let records = Arc::new(db::postgres::PgRecordStore::new(pool));
//!     let state = FeatureState {
//!         blobs: Arc::new(S3BlobStore::new(StorageConfig::from_env()?).await?),
//!         quota: Arc::new(RecordCountQuota::new(records.clone(), config.plans.max_per_user)),
//!         records,
//!         gpx: Arc::new(config.gpx.clone()),
//!     };
//!     let app = api::create_router(state, &config.cors);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod models;
pub mod saga;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use error::{AppError, AppResult};
