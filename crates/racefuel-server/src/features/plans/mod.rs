pub mod commands;
pub mod queries;
pub mod quota;
pub mod routes;

pub use commands::{ImportError, ImportFromCatalogCommand};
pub use queries::{CatalogStatusError, CatalogStatusQuery, CatalogStatusResponse};
pub use quota::{PlanQuota, QuotaDecision, RecordCountQuota};
pub use routes::plans_routes;
