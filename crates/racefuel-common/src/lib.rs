//! Racefuel Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared, I/O-free building blocks for the Racefuel workspace.
//!
//! # Overview
//!
//! - **GPX**: permissive GPX parser producing track points, waypoints and
//!   derived course statistics
//! - **Checksums**: SHA-256 content fingerprints for uploaded GPX files
//! - **Error Handling**: common error and result types
//! - **Logging**: `tracing` subscriber setup shared by the server and CLI
//!
//! # Example
//!
//! ```no_run
//! use racefuel_common::{checksum, gpx};
//!
//! fn describe(raw: &[u8]) -> racefuel_common::Result<()> {
//!     let parsed = gpx::parse_bytes(raw)?;
//!     let digest = checksum::sha256_hex(raw);
//!     tracing::info!(
//!         points = parsed.points.len(),
//!         distance_km = parsed.stats.distance_km,
//!         sha256 = %digest,
//!         "Parsed GPX"
//!     );
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod gpx;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
