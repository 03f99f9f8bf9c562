pub mod catalog_status;

pub use catalog_status::{CatalogStatusError, CatalogStatusQuery, CatalogStatusResponse};
