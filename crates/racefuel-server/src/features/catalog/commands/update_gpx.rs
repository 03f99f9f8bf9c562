//! Replace a catalog race's GPX
//!
//! Runs the ingestion saga in patch mode. Once the row points at the new
//! object, the superseded object is no longer referenced and may be pruned.

use tracing::{info, warn};
use uuid::Uuid;

use super::ingest::{self, IngestMode, IngestionError};
use crate::features::FeatureState;
use crate::models::CatalogRace;

#[derive(Debug, Clone)]
pub struct UpdateCatalogGpxCommand {
    pub race_id: Uuid,
    pub gpx: Option<Vec<u8>>,
}

#[tracing::instrument(skip(state, command), fields(race_id = %command.race_id))]
pub async fn handle(
    state: FeatureState,
    command: UpdateCatalogGpxCommand,
) -> Result<CatalogRace, IngestionError> {
    let race_id = command.race_id;
    let gpx = ingest::validate_upload(command.gpx, &state.gpx)?;

    // Unknown ids are rejected before anything is uploaded
    let previous = state
        .records
        .get_catalog_race(race_id)
        .await
        .map_err(IngestionError::RecordStore)?
        .ok_or(IngestionError::NotFound(race_id))?;

    let updated = ingest::run(&state, race_id, IngestMode::Update, gpx).await?;

    info!(
        race_id = %race_id,
        content_changed = updated.gpx_hash != previous.gpx_hash,
        previous_hash = %previous.gpx_hash,
        gpx_hash = %updated.gpx_hash,
        gpx_path = %updated.gpx_path,
        "Catalog GPX updated"
    );

    if state.gpx.prune_superseded && previous.gpx_path != updated.gpx_path {
        prune_superseded(&state, &previous.gpx_path).await;
    }

    Ok(updated)
}

async fn prune_superseded(state: &FeatureState, key: &str) {
    match state.blobs.delete(&state.gpx.catalog_bucket, key).await {
        Ok(()) => info!(key = %key, "Pruned superseded catalog GPX"),
        Err(err) => warn!(
            key = %key,
            error = %format!("{:#}", err),
            "Failed to prune superseded catalog GPX"
        ),
    }
}
