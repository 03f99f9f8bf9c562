//! `racefuel inspect` command implementation
//!
//! Runs the same parser the server uses for catalog uploads, so the numbers
//! shown here are the ones a catalog race would be saved with.

use std::path::Path;

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use racefuel_common::checksum;
use racefuel_common::gpx::{CourseStats, GpxParser, GpxParserOptions, GpxPoint};
use serde::Serialize;
use tracing::debug;

use super::read_file;
use crate::error::{CliError, Result};
use crate::format::{format_bytes, format_coordinate, format_meters};

#[derive(Debug, Clone, Copy)]
pub struct InspectOptions {
    pub noise_threshold_m: f64,
    pub include_points: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub file: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub name: Option<String>,
    pub point_count: usize,
    pub waypoint_count: usize,
    pub stats: CourseStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<GpxPoint>>,
}

pub fn run(file: &Path, options: InspectOptions, json: bool) -> Result<()> {
    let report = inspect(file, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Parse and fingerprint a GPX file
pub fn inspect(file: &Path, options: InspectOptions) -> Result<InspectReport> {
    if !options.noise_threshold_m.is_finite() || options.noise_threshold_m < 0.0 {
        return Err(CliError::invalid_argument(format!(
            "--noise-threshold must be a non-negative number, got {}",
            options.noise_threshold_m
        )));
    }

    let bytes = read_file(file)?;
    let parser = GpxParser::new(GpxParserOptions {
        elevation_noise_threshold_m: options.noise_threshold_m,
    });

    let parsed = parser
        .parse_bytes(&bytes)
        .map_err(|source| CliError::InvalidGpx {
            file: file.display().to_string(),
            source,
        })?;

    debug!(
        file = %file.display(),
        points = parsed.points.len(),
        waypoints = parsed.waypoints.len(),
        "Parsed GPX"
    );

    Ok(InspectReport {
        file: file.display().to_string(),
        size_bytes: bytes.len() as u64,
        sha256: checksum::sha256_hex(&bytes),
        name: parsed.name,
        point_count: parsed.points.len(),
        waypoint_count: parsed.waypoints.len(),
        stats: parsed.stats,
        points: options.include_points.then_some(parsed.points),
    })
}

fn print_report(report: &InspectReport) {
    let title = report.name.as_deref().unwrap_or("(unnamed track)");
    println!();
    println!("{}", format!("  {}", title).bold());
    println!();

    let stats = &report.stats;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    table.add_row(vec!["File".to_string(), report.file.clone()]);
    table.add_row(vec!["Size".to_string(), format_bytes(report.size_bytes)]);
    table.add_row(vec!["Track points".to_string(), report.point_count.to_string()]);
    table.add_row(vec!["Waypoints".to_string(), report.waypoint_count.to_string()]);
    table.add_row(vec!["Distance".to_string(), format!("{:.2} km", stats.distance_km)]);
    table.add_row(vec![
        "Elevation gain".to_string(),
        format_meters(Some(stats.elevation_gain_m)),
    ]);
    table.add_row(vec![
        "Elevation loss".to_string(),
        format_meters(Some(stats.elevation_loss_m)),
    ]);
    table.add_row(vec!["Min altitude".to_string(), format_meters(stats.min_alt_m)]);
    table.add_row(vec!["Max altitude".to_string(), format_meters(stats.max_alt_m)]);
    table.add_row(vec![
        "Start".to_string(),
        format_coordinate(stats.start_lat, stats.start_lng),
    ]);
    table.add_row(vec![
        "Bounds".to_string(),
        format!(
            "{} to {}",
            format_coordinate(stats.bounds_min_lat, stats.bounds_min_lng),
            format_coordinate(stats.bounds_max_lat, stats.bounds_max_lng)
        ),
    ]);

    println!("{}", table);

    if let Some(points) = &report.points {
        let mut points_table = Table::new();
        points_table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["#", "Lat", "Lng", "Elevation", "Km"]);

        for (index, point) in points.iter().enumerate() {
            points_table.add_row(vec![
                (index + 1).to_string(),
                format!("{:.5}", point.lat),
                format!("{:.5}", point.lng),
                format_meters(point.elevation_m),
                format!("{:.3}", point.cumulative_distance_km),
            ]);
        }

        println!("{}", points_table);
    }

    println!();
    println!("{}", format!("SHA-256: {}", report.sha256.cyan()));
    println!();
}
