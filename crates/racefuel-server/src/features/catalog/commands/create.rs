//! Create catalog race command
//!
//! Metadata arrives as loose multipart text fields. The race name falls back
//! to the GPX track name when the admin leaves it blank.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use super::ingest::{self, IngestMode, IngestionError};
use crate::features::FeatureState;
use crate::models::{CatalogMetadata, CatalogRace};

const RACE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw create request as read from the multipart form
#[derive(Debug, Clone, Default)]
pub struct CreateCatalogRaceCommand {
    pub name: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD`
    pub race_date: Option<String>,
    pub description: Option<String>,
    /// `true`/`false` (also `1`/`0`, `yes`/`no`, `on`/`off`); absent means not live
    pub is_live: Option<String>,
    pub gpx: Option<Vec<u8>>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl CreateCatalogRaceCommand {
    /// Check the typed metadata fields and resolve the display name
    pub fn metadata(&self, track_name: Option<&str>) -> Result<CatalogMetadata, IngestionError> {
        let race_date = non_blank(self.race_date.as_deref())
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, RACE_DATE_FORMAT).map_err(|_| {
                    IngestionError::InvalidMetadata(format!(
                        "race_date must be YYYY-MM-DD, got '{}'",
                        raw
                    ))
                })
            })
            .transpose()?;

        let is_live = match non_blank(self.is_live.as_deref()) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                IngestionError::InvalidMetadata(format!("is_live must be a boolean, got '{}'", raw))
            })?,
            None => false,
        };

        let name = non_blank(self.name.as_deref())
            .or_else(|| non_blank(track_name))
            .ok_or_else(|| {
                IngestionError::InvalidMetadata(
                    "name is required when the GPX has no track name".to_string(),
                )
            })?;

        Ok(CatalogMetadata {
            name,
            location: non_blank(self.location.as_deref()),
            race_date,
            description: non_blank(self.description.as_deref()),
            is_live,
        })
    }
}

#[tracing::instrument(skip(state, command))]
pub async fn handle(
    state: FeatureState,
    mut command: CreateCatalogRaceCommand,
) -> Result<CatalogRace, IngestionError> {
    let gpx = ingest::validate_upload(command.gpx.take(), &state.gpx)?;
    let metadata = command.metadata(gpx.parsed.name.as_deref())?;

    let race_id = Uuid::new_v4();
    let race = ingest::run(&state, race_id, IngestMode::Create(metadata), gpx).await?;

    info!(
        race_id = %race.id,
        name = %race.name,
        distance_km = race.stats.distance_km,
        gpx_path = %race.gpx_path,
        "Catalog race created"
    );

    Ok(race)
}
