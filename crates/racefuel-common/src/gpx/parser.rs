//! Streaming GPX scanner and course statistics
//!
//! The scanner walks the document with `quick-xml` events and only looks at
//! the handful of elements it needs (`trkpt`, `wpt`, their `ele`/`time`/
//! `name`/`desc` children, and the metadata/track names). Namespaces are
//! ignored and quoting may be `"` or `'`. Malformed markup (a bare `&` in a
//! name, a broken tag) is skipped: scanning resumes at the next `<` with the
//! open point or waypoint intact, and only the text field being read is lost.
//!
//! Track points from every `<trk>`/`<trkseg>` are flattened into one
//! continuous sequence.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::geo::{haversine_m, round_to};
use super::models::{CourseStats, GpxPoint, GpxWaypoint, ParsedGpx};
use super::GpxParseError;

/// Elevation changes at or below this magnitude (meters) are treated as GPS jitter.
pub const DEFAULT_ELEVATION_NOISE_THRESHOLD_M: f64 = 1.0;

/// Tunables for [`GpxParser`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpxParserOptions {
    /// Minimum elevation delta between consecutive elevated points that
    /// counts towards gain or loss
    pub elevation_noise_threshold_m: f64,
}

impl Default for GpxParserOptions {
    fn default() -> Self {
        Self {
            elevation_noise_threshold_m: DEFAULT_ELEVATION_NOISE_THRESHOLD_M,
        }
    }
}

/// GPX parser; cheap to construct and reusable across documents
#[derive(Debug, Clone, Default)]
pub struct GpxParser {
    options: GpxParserOptions,
}

impl GpxParser {
    pub fn new(options: GpxParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GpxParserOptions {
        &self.options
    }

    /// Parse raw bytes, replacing invalid UTF-8 sequences
    pub fn parse_bytes(&self, raw: &[u8]) -> Result<ParsedGpx, GpxParseError> {
        self.parse(&String::from_utf8_lossy(raw))
    }

    /// Parse GPX text into points, waypoints and course statistics
    ///
    /// # Errors
    ///
    /// [`GpxParseError::NoTrackPoints`] when no `<trkpt>` carries both a
    /// parseable `lat` and `lon`. Every other defect is skipped.
    pub fn parse(&self, xml: &str) -> Result<ParsedGpx, GpxParseError> {
        let scan = scan_document(xml);

        debug!(
            track_points = scan.track.len(),
            skipped_points = scan.skipped_points,
            waypoints = scan.waypoints.len(),
            skipped_waypoints = scan.skipped_waypoints,
            "Scanned GPX document"
        );

        if scan.track.is_empty() {
            return Err(GpxParseError::NoTrackPoints);
        }

        let mut course = CourseAccumulator::new(self.options.elevation_noise_threshold_m);
        let points = scan
            .track
            .into_iter()
            .map(|raw| course.push(raw))
            .collect();

        Ok(ParsedGpx {
            name: scan.metadata_name.or(scan.track_name),
            points,
            waypoints: scan.waypoints,
            stats: course.finish(),
        })
    }
}

// ============================================================================
// Document scanning
// ============================================================================

#[derive(Debug)]
struct RawTrackPoint {
    lat: f64,
    lng: f64,
    elevation_m: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Debug, Default)]
struct PendingPoint {
    lat: Option<f64>,
    lng: Option<f64>,
    elevation_m: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Debug, Default)]
struct PendingWaypoint {
    lat: Option<f64>,
    lng: Option<f64>,
    name: Option<String>,
    description: Option<String>,
}

/// Text-bearing element currently being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Elevation,
    Time,
    WaypointName,
    WaypointDescription,
    MetadataName,
    TrackName,
}

#[derive(Debug, Default)]
struct DocumentScan {
    track: Vec<RawTrackPoint>,
    waypoints: Vec<GpxWaypoint>,
    metadata_name: Option<String>,
    track_name: Option<String>,
    skipped_points: usize,
    skipped_waypoints: usize,
}

impl DocumentScan {
    fn push_point(&mut self, pending: PendingPoint) {
        match (pending.lat, pending.lng) {
            (Some(lat), Some(lng)) => self.track.push(RawTrackPoint {
                lat,
                lng,
                elevation_m: pending.elevation_m,
                timestamp: pending.timestamp,
            }),
            _ => self.skipped_points += 1,
        }
    }

    fn push_waypoint(&mut self, pending: PendingWaypoint) {
        match (pending.lat, pending.lng) {
            (Some(lat), Some(lng)) => self.waypoints.push(GpxWaypoint {
                lat,
                lng,
                name: pending.name,
                description: pending.description,
            }),
            _ => self.skipped_waypoints += 1,
        }
    }
}

fn scan_document(xml: &str) -> DocumentScan {
    let mut scan = DocumentScan::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut point: Option<PendingPoint> = None;
    let mut waypoint: Option<PendingWaypoint> = None;
    let mut offset = 0;

    // Each pass reads until EOF or malformed markup; after an error a fresh
    // reader resumes at the next `<` past the event that failed
    while offset < xml.len() {
        let mut reader = Reader::from_str(&xml[offset..]);
        reader.config_mut().check_end_names = false;
        let mut capture: Option<(Capture, String)> = None;

        let resume_from = loop {
            let event_start = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.local_name().as_ref().to_vec();
                    match name.as_slice() {
                        b"trkpt" => {
                            let (lat, lng) = coordinates(&e);
                            point = Some(PendingPoint {
                                lat,
                                lng,
                                ..PendingPoint::default()
                            });
                        },
                        b"wpt" => {
                            let (lat, lng) = coordinates(&e);
                            waypoint = Some(PendingWaypoint {
                                lat,
                                lng,
                                ..PendingWaypoint::default()
                            });
                        },
                        other => {
                            capture = capture_for(
                                other,
                                stack.last().map(Vec::as_slice),
                                point.is_some(),
                                waypoint.is_some(),
                            )
                            .map(|field| (field, String::new()));
                        },
                    }
                    stack.push(name);
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"trkpt" => {
                        let (lat, lng) = coordinates(&e);
                        scan.push_point(PendingPoint {
                            lat,
                            lng,
                            ..PendingPoint::default()
                        });
                    },
                    b"wpt" => {
                        let (lat, lng) = coordinates(&e);
                        scan.push_waypoint(PendingWaypoint {
                            lat,
                            lng,
                            ..PendingWaypoint::default()
                        });
                    },
                    _ => {},
                },
                Ok(Event::Text(text)) => {
                    if let Some((_, buffer)) = capture.as_mut() {
                        buffer.push_str(&String::from_utf8_lossy(&text));
                    }
                },
                Ok(Event::CData(cdata)) => {
                    if let Some((_, buffer)) = capture.as_mut() {
                        // Stored escaped so the final unescape pass restores it verbatim
                        buffer.push_str(&escape(String::from_utf8_lossy(&cdata).as_ref()));
                    }
                },
                Ok(Event::GeneralRef(reference)) => {
                    if let Some((_, buffer)) = capture.as_mut() {
                        buffer.push('&');
                        buffer.push_str(&String::from_utf8_lossy(&reference));
                        buffer.push(';');
                    }
                },
                Ok(Event::End(e)) => {
                    if let Some((field, raw)) = capture.take() {
                        apply_capture(field, &raw, &mut point, &mut waypoint, &mut scan);
                    }
                    match e.local_name().as_ref() {
                        b"trkpt" => {
                            if let Some(pending) = point.take() {
                                scan.push_point(pending);
                            }
                        },
                        b"wpt" => {
                            if let Some(pending) = waypoint.take() {
                                scan.push_waypoint(pending);
                            }
                        },
                        _ => {},
                    }
                    stack.pop();
                },
                Ok(Event::Eof) => break None,
                Err(err) => {
                    debug!(
                        position = offset + event_start,
                        error = %err,
                        "Skipping malformed GPX markup"
                    );
                    break Some(offset + event_start + 1);
                },
                Ok(_) => {},
            }
        };

        // A half-read text field is dropped, the enclosing point or waypoint is kept
        match resume_from.and_then(|from| next_tag_start(xml, from)) {
            Some(next) => offset = next,
            None => break,
        }
    }

    // A document truncated inside a <trkpt> still yields that point
    if let Some(pending) = point.take() {
        scan.push_point(pending);
    }

    scan
}

/// Byte offset of the first `<` at or after `from`
fn next_tag_start(xml: &str, from: usize) -> Option<usize> {
    xml.as_bytes()
        .get(from..)?
        .iter()
        .position(|&byte| byte == b'<')
        .map(|index| from + index)
}

fn capture_for(name: &[u8], parent: Option<&[u8]>, in_point: bool, in_waypoint: bool) -> Option<Capture> {
    match (name, in_point, in_waypoint) {
        (b"ele", true, _) => Some(Capture::Elevation),
        (b"time", true, _) => Some(Capture::Time),
        (b"name", false, true) => Some(Capture::WaypointName),
        (b"desc", false, true) => Some(Capture::WaypointDescription),
        (b"name", false, false) => match parent {
            Some(b"metadata") => Some(Capture::MetadataName),
            Some(b"trk") => Some(Capture::TrackName),
            _ => None,
        },
        _ => None,
    }
}

fn apply_capture(
    field: Capture,
    raw: &str,
    point: &mut Option<PendingPoint>,
    waypoint: &mut Option<PendingWaypoint>,
    scan: &mut DocumentScan,
) {
    let text = unescape(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let text = text.trim();

    match field {
        Capture::Elevation => {
            if let Some(point) = point.as_mut() {
                point.elevation_m = parse_number(text);
            }
        },
        Capture::Time => {
            if let Some(point) = point.as_mut() {
                point.timestamp = non_empty(text);
            }
        },
        Capture::WaypointName => {
            if let Some(waypoint) = waypoint.as_mut() {
                waypoint.name = non_empty(text);
            }
        },
        Capture::WaypointDescription => {
            if let Some(waypoint) = waypoint.as_mut() {
                waypoint.description = non_empty(text);
            }
        },
        Capture::MetadataName => {
            if scan.metadata_name.is_none() {
                scan.metadata_name = non_empty(text);
            }
        },
        Capture::TrackName => {
            if scan.track_name.is_none() {
                scan.track_name = non_empty(text);
            }
        },
    }
}

fn coordinates(element: &BytesStart<'_>) -> (Option<f64>, Option<f64>) {
    let mut lat = None;
    let mut lng = None;

    for attribute in element.attributes().with_checks(false).flatten() {
        let value = String::from_utf8_lossy(&attribute.value);
        match attribute.key.local_name().as_ref() {
            b"lat" => lat = parse_number(&value),
            b"lon" => lng = parse_number(&value),
            _ => {},
        }
    }

    (lat, lng)
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

// ============================================================================
// Course statistics
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
}

impl Bounds {
    fn seed(lat: f64, lng: f64) -> Self {
        Self {
            min_lat: lat,
            min_lng: lng,
            max_lat: lat,
            max_lng: lng,
        }
    }

    fn expand(&mut self, lat: f64, lng: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lng = self.min_lng.min(lng);
        self.max_lat = self.max_lat.max(lat);
        self.max_lng = self.max_lng.max(lng);
    }
}

/// Running totals over the track, fed one point at a time
#[derive(Debug)]
struct CourseAccumulator {
    noise_threshold_m: f64,
    distance_m: f64,
    gain_m: f64,
    loss_m: f64,
    previous_position: Option<(f64, f64)>,
    previous_elevation: Option<f64>,
    min_alt_m: Option<f64>,
    max_alt_m: Option<f64>,
    start: Option<(f64, f64)>,
    bounds: Option<Bounds>,
}

impl CourseAccumulator {
    fn new(noise_threshold_m: f64) -> Self {
        Self {
            noise_threshold_m,
            distance_m: 0.0,
            gain_m: 0.0,
            loss_m: 0.0,
            previous_position: None,
            previous_elevation: None,
            min_alt_m: None,
            max_alt_m: None,
            start: None,
            bounds: None,
        }
    }

    fn push(&mut self, raw: RawTrackPoint) -> GpxPoint {
        if let Some((lat, lng)) = self.previous_position {
            self.distance_m += haversine_m(lat, lng, raw.lat, raw.lng);
        }
        self.previous_position = Some((raw.lat, raw.lng));

        if let Some(elevation) = raw.elevation_m {
            if let Some(previous) = self.previous_elevation {
                let diff = elevation - previous;
                if diff > self.noise_threshold_m {
                    self.gain_m += diff;
                } else if diff < -self.noise_threshold_m {
                    self.loss_m += diff.abs();
                }
            }
            self.previous_elevation = Some(elevation);
            self.min_alt_m = Some(self.min_alt_m.map_or(elevation, |min| min.min(elevation)));
            self.max_alt_m = Some(self.max_alt_m.map_or(elevation, |max| max.max(elevation)));
        }

        self.start.get_or_insert((raw.lat, raw.lng));
        match self.bounds.as_mut() {
            Some(bounds) => bounds.expand(raw.lat, raw.lng),
            None => self.bounds = Some(Bounds::seed(raw.lat, raw.lng)),
        }

        GpxPoint {
            lat: raw.lat,
            lng: raw.lng,
            elevation_m: raw.elevation_m,
            timestamp: raw.timestamp,
            cumulative_distance_km: round_to(self.distance_m / 1000.0, 3),
        }
    }

    fn finish(self) -> CourseStats {
        CourseStats {
            distance_km: round_to(self.distance_m / 1000.0, 2),
            elevation_gain_m: round_to(self.gain_m, 1),
            elevation_loss_m: round_to(self.loss_m, 1),
            min_alt_m: self.min_alt_m.map(|v| round_to(v, 1)),
            max_alt_m: self.max_alt_m.map(|v| round_to(v, 1)),
            start_lat: self.start.map(|(lat, _)| lat),
            start_lng: self.start.map(|(_, lng)| lng),
            bounds_min_lat: self.bounds.map(|b| b.min_lat),
            bounds_min_lng: self.bounds.map(|b| b.min_lng),
            bounds_max_lat: self.bounds.map(|b| b.max_lat),
            bounds_max_lng: self.bounds.map(|b| b.max_lng),
        }
    }
}
