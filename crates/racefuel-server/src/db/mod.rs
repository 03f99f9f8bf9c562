//! Record store client
//!
//! The sagas read and write rows through [`RecordStore`]. Production uses
//! [`postgres::PgRecordStore`]; tests use [`memory::InMemoryRecordStore`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{
    AidStationTemplate, CatalogGpxPatch, CatalogRace, NewCatalogRace, NewPlanAidStation,
    NewRacePlan, RacePlan,
};

pub mod memory;
pub mod postgres;

/// Relational operations used by the catalog and plan flows
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_catalog_race(&self, race: &NewCatalogRace) -> Result<CatalogRace>;

    /// Conditional update keyed by id; `None` when no row matched
    async fn patch_catalog_race_gpx(
        &self,
        id: Uuid,
        patch: &CatalogGpxPatch,
    ) -> Result<Option<CatalogRace>>;

    async fn get_catalog_race(&self, id: Uuid) -> Result<Option<CatalogRace>>;

    /// Templates ordered by `order_index`
    async fn list_aid_station_templates(
        &self,
        catalog_race_id: Uuid,
    ) -> Result<Vec<AidStationTemplate>>;

    async fn insert_race_plan(&self, plan: &NewRacePlan) -> Result<RacePlan>;

    /// Removes the plan and, by cascade, its aid stations
    async fn delete_race_plan(&self, id: Uuid) -> Result<()>;

    async fn get_race_plan(&self, id: Uuid) -> Result<Option<RacePlan>>;

    /// All-or-nothing multi-row insert; returns the number of rows written
    async fn insert_plan_aid_stations(
        &self,
        plan_id: Uuid,
        stations: &[NewPlanAidStation],
    ) -> Result<u64>;

    async fn count_plans_for_user(&self, user_id: Uuid) -> Result<i64>;
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
