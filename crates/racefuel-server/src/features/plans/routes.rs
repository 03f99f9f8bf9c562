//! Plan API routes
//!
//! - `POST /api/v1/plans/from-catalog` - import a catalog race as a new plan
//! - `GET /api/v1/plans/:id/catalog-status` - staleness against the catalog

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::commands::ImportFromCatalogCommand;
use super::queries::{CatalogStatusQuery, CatalogStatusResponse};
use crate::api::response::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::features::FeatureState;
use crate::middleware::CurrentUser;

pub fn plans_routes() -> Router<FeatureState> {
    Router::new()
        .route("/from-catalog", post(import_from_catalog))
        .route("/:id/catalog-status", get(catalog_status))
}

/// Import a catalog race into a new plan
///
/// # Request Body
///
/// ```json
/// { "catalogRaceId": "6f1c..." }
/// ```
///
/// # Response
///
/// - `201 Created` - the new plan
/// - `400 Bad Request` - malformed body
/// - `401 Unauthorized` - missing identity
/// - `402 Payment Required` - plan quota exhausted
/// - `404 Not Found` - unknown catalog race
/// - `502 Bad Gateway` - blob or record store failure
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
async fn import_from_catalog(
    State(state): State<FeatureState>,
    user: CurrentUser,
    body: Result<Json<ImportFromCatalogCommand>, JsonRejection>,
) -> AppResult<Response> {
    let Json(command) =
        body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let plan = super::commands::import_from_catalog::handle(state, user.id, command).await?;

    tracing::info!(plan_id = %plan.id, "Plan imported from catalog via API");

    Ok(ApiResponse::created(plan))
}

#[tracing::instrument(skip_all, fields(user_id = %user.id, plan_id = tracing::field::Empty))]
async fn catalog_status(
    State(state): State<FeatureState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiResponse<CatalogStatusResponse>> {
    let Path(id) = path.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    tracing::Span::current().record("plan_id", tracing::field::display(id));

    let status = super::queries::catalog_status::handle(
        state,
        CatalogStatusQuery {
            plan_id: id,
            user_id: user.id,
        },
    )
    .await?;

    Ok(ApiResponse::success(status))
}
