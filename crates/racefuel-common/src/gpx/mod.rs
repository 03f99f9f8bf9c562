//! GPX ingestion primitives
//!
//! Parses GPS Exchange Format documents into an ordered track, an
//! unordered waypoint set and derived [`CourseStats`]. Extraction is
//! deliberately permissive: malformed fragments are dropped, and the only
//! fatal condition is a document without a single usable track point.
//!
//! ```
//! use racefuel_common::gpx;
//!
//! let xml = r#"<gpx><trk><trkseg>
//!     <trkpt lat="45.0" lon="6.0"><ele>100</ele></trkpt>
//!     <trkpt lat="45.001" lon="6.0"><ele>140</ele></trkpt>
//! </trkseg></trk></gpx>"#;
//!
//! let parsed = gpx::parse(xml).unwrap();
//! assert_eq!(parsed.points.len(), 2);
//! assert_eq!(parsed.stats.elevation_gain_m, 40.0);
//! ```

pub mod geo;
pub mod models;
pub mod parser;

pub use models::{CourseStats, GpxPoint, GpxWaypoint, ParsedGpx};
pub use parser::{GpxParser, GpxParserOptions, DEFAULT_ELEVATION_NOISE_THRESHOLD_M};

use thiserror::Error;

/// Errors raised by the GPX parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpxParseError {
    #[error("GPX contains no valid track points")]
    NoTrackPoints,
}

/// Parse GPX text with the default options
pub fn parse(xml: &str) -> Result<ParsedGpx, GpxParseError> {
    GpxParser::default().parse(xml)
}

/// Parse raw GPX bytes with the default options
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn parse_bytes(raw: &[u8]) -> Result<ParsedGpx, GpxParseError> {
    GpxParser::default().parse_bytes(raw)
}
