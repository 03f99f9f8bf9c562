pub mod commands;
pub mod routes;

pub use commands::{CreateCatalogRaceCommand, IngestionError, UpdateCatalogGpxCommand};
pub use routes::catalog_routes;
