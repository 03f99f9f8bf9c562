//! Property tests for the GPX parser

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use racefuel_common::gpx::{self, GpxParseError};

fn render(points: &[(f64, f64, Option<f64>)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><gpx version="1.1"><trk><trkseg>"#);
    for (lat, lng, ele) in points {
        match ele {
            Some(ele) => xml.push_str(&format!(
                r#"<trkpt lat="{lat}" lon="{lng}"><ele>{ele}</ele></trkpt>"#
            )),
            None => xml.push_str(&format!(r#"<trkpt lat="{lat}" lon="{lng}"/>"#)),
        }
    }
    xml.push_str("</trkseg></trk></gpx>");
    xml
}

/// Same document with free text (bare `&` included) before the root and
/// between every pair of track points
fn render_with_junk(points: &[(f64, f64, Option<f64>)], junk: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(junk.first().map(String::as_str).unwrap_or_default());
    xml.push_str(r#"<gpx version="1.1"><trk><trkseg>"#);
    for (index, (lat, lng, ele)) in points.iter().enumerate() {
        if let Some(ele) = ele {
            xml.push_str(&format!(
                r#"<trkpt lat="{lat}" lon="{lng}"><ele>{ele}</ele></trkpt>"#
            ));
        } else {
            xml.push_str(&format!(r#"<trkpt lat="{lat}" lon="{lng}"/>"#));
        }
        xml.push_str(junk.get(index + 1).map(String::as_str).unwrap_or_default());
    }
    xml.push_str("</trkseg></trk></gpx>");
    xml
}

fn track_strategy() -> impl Strategy<Value = Vec<(f64, f64, Option<f64>)>> {
    prop::collection::vec(
        (
            -80.0f64..80.0,
            -179.0f64..179.0,
            prop::option::of(-400.0f64..8800.0),
        ),
        1..60,
    )
}

proptest! {
    #[test]
    fn cumulative_distance_never_decreases(points in track_strategy()) {
        let parsed = gpx::parse(&render(&points)).unwrap();
        prop_assert_eq!(parsed.points.len(), points.len());
        prop_assert_eq!(parsed.points[0].cumulative_distance_km, 0.0);
        for pair in parsed.points.windows(2) {
            prop_assert!(pair[1].cumulative_distance_km >= pair[0].cumulative_distance_km);
        }
    }

    #[test]
    fn final_point_matches_course_distance(points in track_strategy()) {
        let parsed = gpx::parse(&render(&points)).unwrap();
        let last = parsed.points.last().unwrap().cumulative_distance_km;
        // point distances carry 3 decimals, the course total carries 2
        prop_assert!((last - parsed.stats.distance_km).abs() <= 0.0051);
    }

    #[test]
    fn gain_and_loss_are_non_negative(points in track_strategy()) {
        let stats = gpx::parse(&render(&points)).unwrap().stats;
        prop_assert!(stats.elevation_gain_m >= 0.0);
        prop_assert!(stats.elevation_loss_m >= 0.0);
    }

    #[test]
    fn every_point_lies_within_bounds(points in track_strategy()) {
        let parsed = gpx::parse(&render(&points)).unwrap();
        for point in &parsed.points {
            prop_assert!(parsed.stats.encloses(point.lat, point.lng));
        }
        prop_assert_eq!(parsed.stats.start_lat, Some(parsed.points[0].lat));
        prop_assert_eq!(parsed.stats.start_lng, Some(parsed.points[0].lng));
    }

    #[test]
    fn altitude_range_tracks_elevated_points(points in track_strategy()) {
        let stats = gpx::parse(&render(&points)).unwrap().stats;
        let elevated = points.iter().filter_map(|(_, _, ele)| *ele).count();
        prop_assert_eq!(stats.min_alt_m.is_some(), elevated > 0);
        if let (Some(min), Some(max)) = (stats.min_alt_m, stats.max_alt_m) {
            prop_assert!(min <= max);
        }
    }

    #[test]
    fn sub_threshold_jitter_adds_nothing(base in 0.0f64..3000.0, offsets in prop::collection::vec(-0.5f64..0.5, 2..40)) {
        // Every delta between consecutive points stays within the 1 m noise band
        let points: Vec<_> = offsets
            .iter()
            .enumerate()
            .map(|(i, offset)| (45.0 + i as f64 * 1e-4, 6.0, Some(base + offset)))
            .collect();
        let stats = gpx::parse(&render(&points)).unwrap().stats;
        prop_assert_eq!(stats.elevation_gain_m, 0.0);
        prop_assert_eq!(stats.elevation_loss_m, 0.0);
    }

    #[test]
    fn arbitrary_text_never_panics(input in ".{0,400}") {
        match gpx::parse(&input) {
            Ok(parsed) => prop_assert!(!parsed.points.is_empty()),
            Err(err) => prop_assert_eq!(err, GpxParseError::NoTrackPoints),
        }
    }

    #[test]
    fn stray_text_never_drops_points(
        points in track_strategy(),
        junk in prop::collection::vec("[^<>]{0,40}", 61),
    ) {
        let parsed = gpx::parse(&render_with_junk(&points, &junk)).unwrap();
        prop_assert_eq!(parsed.points.len(), points.len());
    }

    #[test]
    fn bare_ampersands_never_drop_points(points in track_strategy(), words in "[a-z ]{0,12}") {
        let junk: Vec<String> = (0..=points.len()).map(|_| format!("{words} & co")).collect();
        let parsed = gpx::parse(&render_with_junk(&points, &junk)).unwrap();
        prop_assert_eq!(parsed.points.len(), points.len());
    }
}
