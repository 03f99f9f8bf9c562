pub mod import_from_catalog;

pub use import_from_catalog::{ImportError, ImportFromCatalogCommand};
