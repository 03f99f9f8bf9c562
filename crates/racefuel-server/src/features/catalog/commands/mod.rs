pub mod create;
pub mod ingest;
pub mod update_gpx;

pub use create::CreateCatalogRaceCommand;
pub use ingest::{IngestMode, IngestionError, ValidatedGpx};
pub use update_gpx::UpdateCatalogGpxCommand;
