//! PostgreSQL [`RecordStore`]

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use racefuel_common::gpx::CourseStats;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::RecordStore;
use crate::models::{
    AidStationTemplate, CatalogGpxPatch, CatalogRace, NewCatalogRace, NewPlanAidStation,
    NewRacePlan, PlannerValues, RacePlan,
};

const CATALOG_RACE_COLUMNS: &str = "id, name, location, race_date, description, is_live, \
     gpx_path, gpx_hash, distance_km, elevation_gain_m, elevation_loss_m, min_alt_m, max_alt_m, \
     start_lat, start_lng, bounds_min_lat, bounds_min_lng, bounds_max_lat, bounds_max_lng, \
     created_at, updated_at";

const RACE_PLAN_COLUMNS: &str = "id, user_id, name, catalog_race_id, gpx_path, course_stats, \
     planner_values, catalog_race_updated_at_at_import, created_at";

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct CatalogRaceRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    race_date: Option<NaiveDate>,
    description: Option<String>,
    is_live: bool,
    gpx_path: String,
    gpx_hash: String,
    distance_km: f64,
    elevation_gain_m: f64,
    elevation_loss_m: f64,
    min_alt_m: Option<f64>,
    max_alt_m: Option<f64>,
    start_lat: Option<f64>,
    start_lng: Option<f64>,
    bounds_min_lat: Option<f64>,
    bounds_min_lng: Option<f64>,
    bounds_max_lat: Option<f64>,
    bounds_max_lng: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CatalogRaceRow> for CatalogRace {
    fn from(row: CatalogRaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            location: row.location,
            race_date: row.race_date,
            description: row.description,
            is_live: row.is_live,
            gpx_path: row.gpx_path,
            gpx_hash: row.gpx_hash,
            stats: CourseStats {
                distance_km: row.distance_km,
                elevation_gain_m: row.elevation_gain_m,
                elevation_loss_m: row.elevation_loss_m,
                min_alt_m: row.min_alt_m,
                max_alt_m: row.max_alt_m,
                start_lat: row.start_lat,
                start_lng: row.start_lng,
                bounds_min_lat: row.bounds_min_lat,
                bounds_min_lng: row.bounds_min_lng,
                bounds_max_lat: row.bounds_max_lat,
                bounds_max_lng: row.bounds_max_lng,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RacePlanRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    catalog_race_id: Option<Uuid>,
    gpx_path: Option<String>,
    course_stats: Option<Json<CourseStats>>,
    planner_values: Json<PlannerValues>,
    catalog_race_updated_at_at_import: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RacePlanRow> for RacePlan {
    fn from(row: RacePlanRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            catalog_race_id: row.catalog_race_id,
            gpx_path: row.gpx_path,
            course_stats: row.course_stats.map(|Json(stats)| stats),
            planner_values: row.planner_values.0,
            catalog_race_updated_at_at_import: row.catalog_race_updated_at_at_import,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, race), fields(race_id = %race.id))]
    async fn insert_catalog_race(&self, race: &NewCatalogRace) -> Result<CatalogRace> {
        let sql = format!(
            "INSERT INTO race_catalog (id, name, location, race_date, description, is_live, \
             gpx_path, gpx_hash, distance_km, elevation_gain_m, elevation_loss_m, min_alt_m, \
             max_alt_m, start_lat, start_lng, bounds_min_lat, bounds_min_lng, bounds_max_lat, \
             bounds_max_lng) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {}",
            CATALOG_RACE_COLUMNS
        );

        let stats = &race.stats;
        let row = sqlx::query_as::<_, CatalogRaceRow>(&sql)
            .bind(race.id)
            .bind(&race.metadata.name)
            .bind(&race.metadata.location)
            .bind(race.metadata.race_date)
            .bind(&race.metadata.description)
            .bind(race.metadata.is_live)
            .bind(&race.gpx_path)
            .bind(&race.gpx_hash)
            .bind(stats.distance_km)
            .bind(stats.elevation_gain_m)
            .bind(stats.elevation_loss_m)
            .bind(stats.min_alt_m)
            .bind(stats.max_alt_m)
            .bind(stats.start_lat)
            .bind(stats.start_lng)
            .bind(stats.bounds_min_lat)
            .bind(stats.bounds_min_lng)
            .bind(stats.bounds_max_lat)
            .bind(stats.bounds_max_lng)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert catalog race")?;

        Ok(row.into())
    }

    #[instrument(skip(self, patch))]
    async fn patch_catalog_race_gpx(
        &self,
        id: Uuid,
        patch: &CatalogGpxPatch,
    ) -> Result<Option<CatalogRace>> {
        let sql = format!(
            "UPDATE race_catalog SET gpx_path = $2, gpx_hash = $3, distance_km = $4, \
             elevation_gain_m = $5, elevation_loss_m = $6, min_alt_m = $7, max_alt_m = $8, \
             start_lat = $9, start_lng = $10, bounds_min_lat = $11, bounds_min_lng = $12, \
             bounds_max_lat = $13, bounds_max_lng = $14, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            CATALOG_RACE_COLUMNS
        );

        let stats = &patch.stats;
        let row = sqlx::query_as::<_, CatalogRaceRow>(&sql)
            .bind(id)
            .bind(&patch.gpx_path)
            .bind(&patch.gpx_hash)
            .bind(stats.distance_km)
            .bind(stats.elevation_gain_m)
            .bind(stats.elevation_loss_m)
            .bind(stats.min_alt_m)
            .bind(stats.max_alt_m)
            .bind(stats.start_lat)
            .bind(stats.start_lng)
            .bind(stats.bounds_min_lat)
            .bind(stats.bounds_min_lng)
            .bind(stats.bounds_max_lat)
            .bind(stats.bounds_max_lng)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update catalog race GPX")?;

        Ok(row.map(Into::into))
    }

    async fn get_catalog_race(&self, id: Uuid) -> Result<Option<CatalogRace>> {
        let sql = format!("SELECT {} FROM race_catalog WHERE id = $1", CATALOG_RACE_COLUMNS);

        let row = sqlx::query_as::<_, CatalogRaceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load catalog race")?;

        Ok(row.map(Into::into))
    }

    async fn list_aid_station_templates(
        &self,
        catalog_race_id: Uuid,
    ) -> Result<Vec<AidStationTemplate>> {
        sqlx::query_as::<_, AidStationTemplateRow>(
            "SELECT id, catalog_race_id, name, distance_km, water_available, notes, order_index \
             FROM race_catalog_aid_stations WHERE catalog_race_id = $1 ORDER BY order_index ASC",
        )
        .bind(catalog_race_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .context("Failed to load aid station templates")
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id, user_id = %plan.user_id))]
    async fn insert_race_plan(&self, plan: &NewRacePlan) -> Result<RacePlan> {
        let sql = format!(
            "INSERT INTO race_plans (id, user_id, name, catalog_race_id, gpx_path, course_stats, \
             planner_values, catalog_race_updated_at_at_import) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            RACE_PLAN_COLUMNS
        );

        let row = sqlx::query_as::<_, RacePlanRow>(&sql)
            .bind(plan.id)
            .bind(plan.user_id)
            .bind(&plan.name)
            .bind(plan.catalog_race_id)
            .bind(&plan.gpx_path)
            .bind(plan.course_stats.as_ref().map(Json))
            .bind(Json(&plan.planner_values))
            .bind(plan.catalog_race_updated_at_at_import)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert race plan")?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete_race_plan(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM race_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete race plan")?;
        Ok(())
    }

    async fn get_race_plan(&self, id: Uuid) -> Result<Option<RacePlan>> {
        let sql = format!("SELECT {} FROM race_plans WHERE id = $1", RACE_PLAN_COLUMNS);

        let row = sqlx::query_as::<_, RacePlanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load race plan")?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, stations), fields(count = stations.len()))]
    async fn insert_plan_aid_stations(
        &self,
        plan_id: Uuid,
        stations: &[NewPlanAidStation],
    ) -> Result<u64> {
        if stations.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO plan_aid_stations \
             (plan_id, name, distance_km, water_available, notes, order_index) ",
        );
        builder.push_values(stations, |mut row, station| {
            row.push_bind(plan_id)
                .push_bind(&station.name)
                .push_bind(station.distance_km)
                .push_bind(station.water_available)
                .push_bind(&station.notes)
                .push_bind(station.order_index);
        });

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to insert plan aid stations")?;

        Ok(result.rows_affected())
    }

    async fn count_plans_for_user(&self, user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM race_plans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count race plans")
    }
}

#[derive(Debug, FromRow)]
struct AidStationTemplateRow {
    id: Uuid,
    catalog_race_id: Uuid,
    name: String,
    distance_km: f64,
    water_available: bool,
    notes: Option<String>,
    order_index: i32,
}

impl From<AidStationTemplateRow> for AidStationTemplate {
    fn from(row: AidStationTemplateRow) -> Self {
        Self {
            id: row.id,
            catalog_race_id: row.catalog_race_id,
            name: row.name,
            distance_km: row.distance_km,
            water_available: row.water_available,
            notes: row.notes,
            order_index: row.order_index,
        }
    }
}
