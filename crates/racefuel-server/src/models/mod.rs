//! Domain records persisted by the record store

use chrono::{DateTime, NaiveDate, Utc};
use racefuel_common::gpx::CourseStats;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptive fields of a catalog race, set at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    pub name: String,
    pub location: Option<String>,
    pub race_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_live: bool,
}

/// Admin-curated race template with its own GPX and derived statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRace {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub race_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_live: bool,
    /// Blob key inside the catalog bucket
    pub gpx_path: String,
    /// Hex SHA-256 of the stored GPX bytes
    pub gpx_hash: String,
    #[serde(flatten)]
    pub stats: CourseStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for [`CatalogRace`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogRace {
    pub id: Uuid,
    pub metadata: CatalogMetadata,
    pub gpx_path: String,
    pub gpx_hash: String,
    pub stats: CourseStats,
}

/// Fields rewritten when a catalog race receives a new GPX
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogGpxPatch {
    pub gpx_path: String,
    pub gpx_hash: String,
    pub stats: CourseStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidStationTemplate {
    pub id: Uuid,
    pub catalog_race_id: Uuid,
    pub name: String,
    pub distance_km: f64,
    pub water_available: bool,
    pub notes: Option<String>,
    pub order_index: i32,
}

/// Aid station entry inside a plan's planner payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedAidStation {
    pub name: String,
    pub distance_km: f64,
    pub water_available: bool,
    pub notes: Option<String>,
}

/// Inputs the fueling planner starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerValues {
    pub aid_stations: Vec<PlannedAidStation>,
    pub course_distance_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
}

impl PlannerValues {
    /// Straight mapping of the catalog's stored stats and templates
    pub fn from_catalog(race: &CatalogRace, templates: &[AidStationTemplate]) -> Self {
        Self {
            aid_stations: templates
                .iter()
                .map(|t| PlannedAidStation {
                    name: t.name.clone(),
                    distance_km: t.distance_km,
                    water_available: t.water_available,
                    notes: t.notes.clone(),
                })
                .collect(),
            course_distance_km: race.stats.distance_km,
            elevation_gain_m: race.stats.elevation_gain_m,
            elevation_loss_m: race.stats.elevation_loss_m,
        }
    }
}

/// User-owned plan, possibly imported from a catalog race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacePlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub catalog_race_id: Option<Uuid>,
    /// Blob key of the plan's private copy inside the plan bucket
    pub gpx_path: Option<String>,
    /// Snapshot of the catalog stats at import time
    pub course_stats: Option<CourseStats>,
    pub planner_values: PlannerValues,
    pub catalog_race_updated_at_at_import: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRacePlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub catalog_race_id: Option<Uuid>,
    pub gpx_path: Option<String>,
    pub course_stats: Option<CourseStats>,
    pub planner_values: PlannerValues,
    pub catalog_race_updated_at_at_import: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlanAidStation {
    pub name: String,
    pub distance_km: f64,
    pub water_available: bool,
    pub notes: Option<String>,
    pub order_index: i32,
}

impl From<&AidStationTemplate> for NewPlanAidStation {
    fn from(template: &AidStationTemplate) -> Self {
        Self {
            name: template.name.clone(),
            distance_km: template.distance_km,
            water_available: template.water_available,
            notes: template.notes.clone(),
            order_index: template.order_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> CourseStats {
        CourseStats {
            distance_km: 42.2,
            elevation_gain_m: 1200.0,
            elevation_loss_m: 1150.5,
            min_alt_m: Some(300.0),
            max_alt_m: Some(1500.0),
            start_lat: Some(45.0),
            start_lng: Some(6.0),
            bounds_min_lat: Some(44.9),
            bounds_min_lng: Some(5.9),
            bounds_max_lat: Some(45.2),
            bounds_max_lng: Some(6.3),
        }
    }

    fn race() -> CatalogRace {
        CatalogRace {
            id: Uuid::new_v4(),
            name: "Trail des Cimes".to_string(),
            location: Some("Chamonix".to_string()),
            race_date: NaiveDate::from_ymd_opt(2025, 8, 30),
            description: None,
            is_live: true,
            gpx_path: "catalog/x/1.gpx".to_string(),
            gpx_hash: "abc".to_string(),
            stats: stats(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_catalog_race_flattens_stats() {
        let json = serde_json::to_value(race()).unwrap();
        assert_eq!(json["distanceKm"], 42.2);
        assert_eq!(json["elevationGainM"], 1200.0);
        assert_eq!(json["gpxPath"], "catalog/x/1.gpx");
        assert_eq!(json["raceDate"], "2025-08-30");
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_planner_values_from_catalog() {
        let race = race();
        let templates = vec![AidStationTemplate {
            id: Uuid::new_v4(),
            catalog_race_id: race.id,
            name: "Col".to_string(),
            distance_km: 12.5,
            water_available: true,
            notes: Some("Soup".to_string()),
            order_index: 0,
        }];

        let values = PlannerValues::from_catalog(&race, &templates);
        assert_eq!(values.course_distance_km, 42.2);
        assert_eq!(values.elevation_loss_m, 1150.5);
        assert_eq!(values.aid_stations.len(), 1);
        assert_eq!(values.aid_stations[0].notes.as_deref(), Some("Soup"));

        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json["aidStations"][0]["waterAvailable"], true);
        assert_eq!(json["courseDistanceKm"], 42.2);
    }
}
