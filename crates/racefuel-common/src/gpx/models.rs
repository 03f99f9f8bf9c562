//! Data types produced by the GPX parser

use serde::{Deserialize, Serialize};

/// One GPS fix along the track, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxPoint {
    pub lat: f64,
    pub lng: f64,
    pub elevation_m: Option<f64>,
    /// Raw `<time>` text, not validated as a timestamp
    pub timestamp: Option<String>,
    /// Distance from the first point, km rounded to 3 decimals
    pub cumulative_distance_km: f64,
}

/// A named point of interest, independent of the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxWaypoint {
    pub lat: f64,
    pub lng: f64,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Course statistics derived from the track points
///
/// Produced only for tracks with at least one point, so every optional
/// positional field is populated whenever the parser returns successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub min_alt_m: Option<f64>,
    pub max_alt_m: Option<f64>,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub bounds_min_lat: Option<f64>,
    pub bounds_min_lng: Option<f64>,
    pub bounds_max_lat: Option<f64>,
    pub bounds_max_lng: Option<f64>,
}

impl CourseStats {
    /// Whether the point lies inside the stored bounding box
    pub fn encloses(&self, lat: f64, lng: f64) -> bool {
        match (
            self.bounds_min_lat,
            self.bounds_max_lat,
            self.bounds_min_lng,
            self.bounds_max_lng,
        ) {
            (Some(min_lat), Some(max_lat), Some(min_lng), Some(max_lng)) => {
                (min_lat..=max_lat).contains(&lat) && (min_lng..=max_lng).contains(&lng)
            },
            _ => false,
        }
    }
}

/// Full parser output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedGpx {
    /// `<metadata><name>`, else the first `<trk><name>`
    pub name: Option<String>,
    pub points: Vec<GpxPoint>,
    pub waypoints: Vec<GpxWaypoint>,
    pub stats: CourseStats,
}
