//! Catalog API routes (admin only)
//!
//! - `POST /api/v1/race-catalog` - create a catalog race from a GPX upload
//! - `PUT /api/v1/race-catalog/:id/gpx` - replace a catalog race's GPX
//!
//! Both take `multipart/form-data` with the file in the `gpx` field. Create
//! also reads `name`, `location`, `race_date`, `description` and `is_live`.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::PathRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    response::Response,
    routing::{post, put},
    Router,
};
use uuid::Uuid;

use super::commands::{ingest::GPX_FIELD, CreateCatalogRaceCommand, UpdateCatalogGpxCommand};
use crate::api::response::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::features::FeatureState;
use crate::middleware::AdminUser;

/// Room for multipart boundaries and the metadata fields
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes for the catalog, with the request body capped near the upload limit
pub fn catalog_routes(max_upload_bytes: usize) -> Router<FeatureState> {
    Router::new()
        .route("/", post(create_catalog_race))
        .route("/:id/gpx", put(update_catalog_gpx))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

/// Text fields and file collected from a catalog form
#[derive(Debug, Default)]
struct CatalogForm {
    gpx: Option<Vec<u8>>,
    name: Option<String>,
    location: Option<String>,
    race_date: Option<String>,
    description: Option<String>,
    is_live: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<CatalogForm> {
    let mut form = CatalogForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e.body_text())))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == GPX_FIELD {
            let data = field.bytes().await.map_err(|e| {
                AppError::Validation(format!("Failed to read GPX file: {}", e.body_text()))
            })?;
            form.gpx = Some(data.to_vec());
            continue;
        }

        let slot = match field_name.as_str() {
            "name" => &mut form.name,
            "location" => &mut form.location,
            "race_date" => &mut form.race_date,
            "description" => &mut form.description,
            "is_live" => &mut form.is_live,
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
                continue;
            },
        };
        let text = field.text().await.map_err(|e| {
            AppError::Validation(format!("Failed to read field '{}': {}", field_name, e.body_text()))
        })?;
        *slot = Some(text);
    }

    Ok(form)
}

/// Create a catalog race
///
/// # Response
///
/// - `201 Created` - catalog race with flattened course stats
/// - `400 Bad Request` - missing/empty/oversized file or bad metadata
/// - `401`/`403` - missing identity or not an admin
/// - `422 Unprocessable Entity` - GPX without usable track points
/// - `502 Bad Gateway` - blob or record store failure
#[tracing::instrument(skip_all, fields(admin_id = %admin.id()))]
async fn create_catalog_race(
    State(state): State<FeatureState>,
    admin: AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let multipart =
        multipart.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let form = read_form(multipart).await?;

    let command = CreateCatalogRaceCommand {
        name: form.name,
        location: form.location,
        race_date: form.race_date,
        description: form.description,
        is_live: form.is_live,
        gpx: form.gpx,
    };

    let race = super::commands::create::handle(state, command).await?;

    tracing::info!(race_id = %race.id, "Catalog race created via API");

    Ok(ApiResponse::created(race))
}

/// Replace the GPX of an existing catalog race
///
/// # Response
///
/// - `200 OK` - updated catalog race
/// - `404 Not Found` - unknown race id
/// - otherwise as for create
#[tracing::instrument(skip_all, fields(admin_id = %admin.id(), race_id = tracing::field::Empty))]
async fn update_catalog_gpx(
    State(state): State<FeatureState>,
    admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<ApiResponse<crate::models::CatalogRace>> {
    let Path(id) = path.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    tracing::Span::current().record("race_id", tracing::field::display(id));
    let multipart =
        multipart.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let form = read_form(multipart).await?;

    let command = UpdateCatalogGpxCommand {
        race_id: id,
        gpx: form.gpx,
    };

    let race = super::commands::update_gpx::handle(state, command).await?;

    Ok(ApiResponse::success(race))
}
