//! In-memory wiring shared by the unit and route tests

use std::sync::Arc;

use axum::{response::Response, Router};
use chrono::{Duration, Utc};
use racefuel_common::gpx::CourseStats;
use serde_json::Value;
use uuid::Uuid;

use crate::api;
use crate::config::{CorsConfig, GpxConfig};
use crate::db::memory::InMemoryRecordStore;
use crate::features::plans::quota::RecordCountQuota;
use crate::features::FeatureState;
use crate::models::{AidStationTemplate, CatalogRace};
use crate::storage::memory::InMemoryBlobStore;
use crate::storage::{BlobStore, GPX_CONTENT_TYPE};

/// Three points rising 40 m then dropping 50 m
pub const THREE_POINT_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="racefuel-tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Ridge Run GPX</name>
    <trkseg>
      <trkpt lat="45.0" lon="6.0"><ele>100</ele></trkpt>
      <trkpt lat="45.01" lon="6.0"><ele>140</ele></trkpt>
      <trkpt lat="45.01" lon="6.01"><ele>90</ele></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

const BOUNDARY: &str = "racefuel-test-boundary";

pub struct TestHarness {
    pub blobs: Arc<InMemoryBlobStore>,
    pub records: Arc<InMemoryRecordStore>,
    pub gpx: GpxConfig,
    plan_limit: Option<u32>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_gpx(GpxConfig::default())
    }

    pub fn with_gpx(gpx: GpxConfig) -> Self {
        Self {
            blobs: Arc::new(InMemoryBlobStore::new()),
            records: Arc::new(InMemoryRecordStore::new()),
            gpx,
            plan_limit: None,
        }
    }

    pub fn with_plan_limit(limit: u32) -> Self {
        Self {
            plan_limit: Some(limit),
            ..Self::new()
        }
    }

    pub fn state(&self) -> FeatureState {
        FeatureState {
            blobs: self.blobs.clone(),
            records: self.records.clone(),
            quota: Arc::new(RecordCountQuota::new(self.records.clone(), self.plan_limit)),
            gpx: Arc::new(self.gpx.clone()),
        }
    }

    pub fn router(&self) -> Router {
        api::create_router(
            self.state(),
            &CorsConfig {
                allowed_origins: vec!["*".to_string()],
                allow_credentials: false,
            },
        )
    }

    /// Catalog race with its GPX object and `stations` ordered templates
    pub async fn seed_catalog_with_stations(&self, name: &str, stations: usize) -> CatalogRace {
        let race = catalog_race(name);
        self.blobs
            .put(
                &self.gpx.catalog_bucket,
                &race.gpx_path,
                THREE_POINT_GPX.as_bytes().to_vec(),
                GPX_CONTENT_TYPE,
            )
            .await
            .unwrap();
        self.records.seed_catalog_race(race.clone());
        self.records
            .seed_aid_station_templates(aid_station_templates(race.id, stations));
        race
    }
}

pub fn catalog_race(name: &str) -> CatalogRace {
    let id = Uuid::new_v4();
    let created_at = Utc::now() - Duration::days(7);
    CatalogRace {
        id,
        name: name.to_string(),
        location: Some("Annecy".to_string()),
        race_date: None,
        description: None,
        is_live: true,
        gpx_path: format!("catalog/{}/1700000000000.gpx", id),
        gpx_hash: "0".repeat(64),
        stats: CourseStats {
            distance_km: 2.2,
            elevation_gain_m: 40.0,
            elevation_loss_m: 50.0,
            min_alt_m: Some(90.0),
            max_alt_m: Some(140.0),
            start_lat: Some(45.0),
            start_lng: Some(6.0),
            bounds_min_lat: Some(45.0),
            bounds_min_lng: Some(6.0),
            bounds_max_lat: Some(45.01),
            bounds_max_lng: Some(6.01),
        },
        created_at,
        updated_at: created_at,
    }
}

pub fn aid_station_templates(catalog_race_id: Uuid, count: usize) -> Vec<AidStationTemplate> {
    (0..count)
        .map(|i| AidStationTemplate {
            id: Uuid::new_v4(),
            catalog_race_id,
            name: format!("Aid {}", i + 1),
            distance_km: 5.0 * (i as f64 + 1.0),
            water_available: i % 2 == 0,
            notes: None,
            order_index: i as i32,
        })
        .collect()
}

/// `multipart/form-data` body with text fields and an optional `gpx` file
pub fn multipart_body(fields: &[(&str, &str)], gpx: Option<&[u8]>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(gpx) = gpx {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"gpx\"; filename=\"course.gpx\"\r\nContent-Type: {GPX_CONTENT_TYPE}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(gpx);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
