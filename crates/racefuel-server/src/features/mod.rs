//! Feature slices of the Racefuel API
//!
//! - **catalog**: admin upload and replacement of catalog race GPX files
//! - **plans**: importing a catalog race into a user's plan, staleness checks
//!
//! Each slice keeps write operations in `commands/`, reads in `queries/` and
//! HTTP wiring in `routes.rs`. Handlers are plain async functions taking the
//! shared [`FeatureState`] and a command value.

pub mod catalog;
pub mod plans;

use std::sync::Arc;

use axum::Router;

use crate::config::GpxConfig;
use crate::db::RecordStore;
use crate::storage::BlobStore;
use plans::quota::PlanQuota;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
    /// Entitlement check consulted before a plan is created
    pub quota: Arc<dyn PlanQuota>,
    pub gpx: Arc<GpxConfig>,
}

/// Mounts every feature under its path prefix:
/// - `/race-catalog` - catalog GPX ingestion (admin)
/// - `/plans` - catalog import and staleness
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest(
            "/race-catalog",
            catalog::catalog_routes(state.gpx.max_upload_bytes),
        )
        .nest("/plans", plans::plans_routes())
        .with_state(state)
}
