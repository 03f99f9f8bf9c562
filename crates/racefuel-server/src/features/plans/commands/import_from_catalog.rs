//! Import a catalog race into a new user plan
//!
//! Steps, each undone in reverse order when a later one fails:
//!
//! 1. copy the catalog GPX to `{userId}/{planId}.gpx` (store-side copy)
//! 2. insert the plan row with the frozen course stats and planner values
//! 3. bulk-insert the aid stations, when the catalog race has any
//!
//! A plan is either imported with its full aid-station set or not persisted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::RecordStore;
use crate::error::AppError;
use crate::features::plans::quota::QuotaDecision;
use crate::features::FeatureState;
use crate::models::{
    AidStationTemplate, CatalogRace, NewPlanAidStation, NewRacePlan, PlannerValues, RacePlan,
};
use crate::saga::{Saga, SagaStep};
use crate::storage::{plan_gpx_key, BlobStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFromCatalogCommand {
    pub catalog_race_id: Uuid,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Catalog race {0} not found")]
    NotFound(Uuid),

    #[error("Plan limit of {limit} reached")]
    QuotaExceeded { limit: u32 },

    #[error("Entitlement check failed: {0:#}")]
    Entitlement(#[source] anyhow::Error),

    #[error("Blob store request failed: {0:#}")]
    BlobStore(#[source] anyhow::Error),

    #[error("Record store request failed: {0:#}")]
    RecordStore(#[source] anyhow::Error),

    #[error("Inserted {written} of {expected} aid stations")]
    IncompleteAidStations { expected: usize, written: u64 },

    #[error("Import aborted: {0}")]
    Aborted(String),
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NotFound(_) => AppError::NotFound(err.to_string()),
            ImportError::QuotaExceeded { .. } => AppError::PaymentRequired(err.to_string()),
            ImportError::Entitlement(source) => {
                AppError::dependency("Failed to check the plan quota", source)
            },
            ImportError::BlobStore(source) => {
                AppError::dependency("Failed to copy the course GPX", source)
            },
            ImportError::RecordStore(source) => {
                AppError::dependency("Failed to save the plan", source)
            },
            ImportError::IncompleteAidStations { .. } => {
                let message = err.to_string();
                AppError::dependency("Failed to save the plan", anyhow::anyhow!(message))
            },
            ImportError::Aborted(message) => AppError::Internal(message),
        }
    }
}

struct ImportContext {
    user_id: Uuid,
    plan_id: Uuid,
    race: CatalogRace,
    templates: Vec<AidStationTemplate>,
    source_bucket: String,
    dest_bucket: String,
    dest_key: String,
    plan: Option<RacePlan>,
}

struct CopyCatalogGpx {
    blobs: Arc<dyn BlobStore>,
}

#[async_trait]
impl SagaStep<ImportContext, ImportError> for CopyCatalogGpx {
    fn name(&self) -> &'static str {
        "copy_catalog_gpx"
    }

    async fn execute(&self, ctx: &mut ImportContext) -> Result<(), ImportError> {
        self.blobs
            .copy(
                &ctx.source_bucket,
                &ctx.race.gpx_path,
                &ctx.dest_bucket,
                &ctx.dest_key,
            )
            .await
            .map_err(ImportError::BlobStore)?;
        debug!(plan_id = %ctx.plan_id, key = %ctx.dest_key, "Catalog GPX copied");
        Ok(())
    }

    async fn compensate(&self, ctx: &ImportContext) -> anyhow::Result<()> {
        info!(plan_id = %ctx.plan_id, key = %ctx.dest_key, "Removing copied plan GPX");
        self.blobs.delete(&ctx.dest_bucket, &ctx.dest_key).await
    }
}

struct InsertRacePlan {
    records: Arc<dyn RecordStore>,
}

#[async_trait]
impl SagaStep<ImportContext, ImportError> for InsertRacePlan {
    fn name(&self) -> &'static str {
        "insert_race_plan"
    }

    async fn execute(&self, ctx: &mut ImportContext) -> Result<(), ImportError> {
        let plan = NewRacePlan {
            id: ctx.plan_id,
            user_id: ctx.user_id,
            name: ctx.race.name.clone(),
            catalog_race_id: Some(ctx.race.id),
            gpx_path: Some(ctx.dest_key.clone()),
            course_stats: Some(ctx.race.stats.clone()),
            planner_values: PlannerValues::from_catalog(&ctx.race, &ctx.templates),
            catalog_race_updated_at_at_import: Some(ctx.race.updated_at),
        };

        let created = self
            .records
            .insert_race_plan(&plan)
            .await
            .map_err(ImportError::RecordStore)?;
        ctx.plan = Some(created);
        Ok(())
    }

    async fn compensate(&self, ctx: &ImportContext) -> anyhow::Result<()> {
        info!(plan_id = %ctx.plan_id, "Removing partially imported plan");
        self.records.delete_race_plan(ctx.plan_id).await
    }
}

struct InsertPlanAidStations {
    records: Arc<dyn RecordStore>,
}

#[async_trait]
impl SagaStep<ImportContext, ImportError> for InsertPlanAidStations {
    fn name(&self) -> &'static str {
        "insert_plan_aid_stations"
    }

    async fn execute(&self, ctx: &mut ImportContext) -> Result<(), ImportError> {
        if ctx.templates.is_empty() {
            return Ok(());
        }

        let stations: Vec<NewPlanAidStation> = ctx.templates.iter().map(Into::into).collect();
        let written = self
            .records
            .insert_plan_aid_stations(ctx.plan_id, &stations)
            .await
            .map_err(ImportError::RecordStore)?;

        if written != stations.len() as u64 {
            return Err(ImportError::IncompleteAidStations {
                expected: stations.len(),
                written,
            });
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state, command), fields(catalog_race_id = %command.catalog_race_id))]
pub async fn handle(
    state: FeatureState,
    user_id: Uuid,
    command: ImportFromCatalogCommand,
) -> Result<RacePlan, ImportError> {
    let race_id = command.catalog_race_id;

    if let QuotaDecision::Exhausted { limit } = state
        .quota
        .check(user_id)
        .await
        .map_err(ImportError::Entitlement)?
    {
        info!(user_id = %user_id, limit, "Plan quota exhausted");
        return Err(ImportError::QuotaExceeded { limit });
    }

    // Independent reads
    let (race, templates) = tokio::try_join!(
        state.records.get_catalog_race(race_id),
        state.records.list_aid_station_templates(race_id)
    )
    .map_err(ImportError::RecordStore)?;
    let race = race.ok_or(ImportError::NotFound(race_id))?;

    let plan_id = Uuid::new_v4();
    let context = ImportContext {
        user_id,
        plan_id,
        dest_key: plan_gpx_key(user_id, plan_id),
        source_bucket: state.gpx.catalog_bucket.clone(),
        dest_bucket: state.gpx.plan_bucket.clone(),
        race,
        templates,
        plan: None,
    };
    let aid_station_count = context.templates.len();

    let saga = Saga::new("catalog_to_plan")
        .step(CopyCatalogGpx {
            blobs: Arc::clone(&state.blobs),
        })
        .step(InsertRacePlan {
            records: Arc::clone(&state.records),
        })
        .step(InsertPlanAidStations {
            records: Arc::clone(&state.records),
        });

    let context = saga
        .run_detached(context)
        .await
        .map_err(|e| ImportError::Aborted(format!("import task failed: {}", e)))??;

    let plan = context
        .plan
        .ok_or_else(|| ImportError::Aborted("saga finished without a plan".to_string()))?;

    info!(
        plan_id = %plan.id,
        user_id = %user_id,
        aid_stations = aid_station_count,
        "Catalog race imported into plan"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::RecordOp;
    use crate::storage::memory::BlobOp;
    use crate::test_support::{self, TestHarness};

    fn command(race: &CatalogRace) -> ImportFromCatalogCommand {
        ImportFromCatalogCommand {
            catalog_race_id: race.id,
        }
    }

    #[tokio::test]
    async fn test_import_copies_blob_and_stations() {
        let harness = TestHarness::new();
        let race = harness.seed_catalog_with_stations("Ridge Run", 2).await;
        let user_id = Uuid::new_v4();

        let plan = handle(harness.state(), user_id, command(&race)).await.unwrap();

        assert_eq!(plan.user_id, user_id);
        assert_eq!(plan.catalog_race_id, Some(race.id));
        assert_eq!(plan.name, "Ridge Run");
        assert_eq!(plan.course_stats.as_ref(), Some(&race.stats));
        assert_eq!(plan.catalog_race_updated_at_at_import, Some(race.updated_at));
        assert_eq!(plan.planner_values.aid_stations.len(), 2);
        assert_eq!(plan.planner_values.course_distance_km, race.stats.distance_km);

        let key = plan_gpx_key(user_id, plan.id);
        assert_eq!(plan.gpx_path.as_deref(), Some(key.as_str()));
        let copy = harness.blobs.get(&harness.gpx.plan_bucket, &key).unwrap();
        let original = harness
            .blobs
            .get(&harness.gpx.catalog_bucket, &race.gpx_path)
            .unwrap();
        assert_eq!(copy.bytes, original.bytes);
        assert_eq!(harness.records.plan_aid_station_count(plan.id), 2);
    }

    #[tokio::test]
    async fn test_import_without_stations_skips_bulk_insert() {
        let harness = TestHarness::new();
        let race = harness.seed_catalog_with_stations("Flat 10K", 0).await;
        harness.records.fail_on(RecordOp::InsertPlanAidStations);

        let plan = handle(harness.state(), Uuid::new_v4(), command(&race))
            .await
            .unwrap();

        assert!(plan.planner_values.aid_stations.is_empty());
        assert_eq!(harness.records.race_plan_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_aid_station_failure_rolls_back() {
        let harness = TestHarness::new();
        let race = harness.seed_catalog_with_stations("Ridge Run", 2).await;
        harness.records.fail_on(RecordOp::InsertPlanAidStations);
        let user_id = Uuid::new_v4();

        let err = handle(harness.state(), user_id, command(&race))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::RecordStore(_)));
        assert_eq!(harness.records.race_plan_count(), 0);
        assert!(harness.blobs.keys(&harness.gpx.plan_bucket).is_empty());
        // The catalog's own object is untouched
        assert!(harness
            .blobs
            .contains(&harness.gpx.catalog_bucket, &race.gpx_path));
    }

    #[tokio::test]
    async fn test_plan_insert_failure_removes_copy() {
        let harness = TestHarness::new();
        let race = harness.seed_catalog_with_stations("Ridge Run", 1).await;
        harness.records.fail_on(RecordOp::InsertRacePlan);

        let err = handle(harness.state(), Uuid::new_v4(), command(&race))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::RecordStore(_)));
        assert!(harness.blobs.keys(&harness.gpx.plan_bucket).is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_persists_nothing() {
        let harness = TestHarness::new();
        let race = harness.seed_catalog_with_stations("Ridge Run", 1).await;
        harness.blobs.fail_on(BlobOp::Copy);

        let err = handle(harness.state(), Uuid::new_v4(), command(&race))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::BlobStore(_)));
        assert_eq!(harness.records.race_plan_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_catalog_race() {
        let harness = TestHarness::new();

        let err = handle(
            harness.state(),
            Uuid::new_v4(),
            ImportFromCatalogCommand {
                catalog_race_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::NotFound(_)));
        assert!(harness.blobs.is_empty());
    }

    #[tokio::test]
    async fn test_quota_exhausted_before_any_side_effect() {
        let harness = TestHarness::with_plan_limit(0);
        let race = harness.seed_catalog_with_stations("Ridge Run", 1).await;

        let err = handle(harness.state(), Uuid::new_v4(), command(&race))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::QuotaExceeded { limit: 0 }));
        assert!(harness.blobs.keys(&harness.gpx.plan_bucket).is_empty());
        assert_eq!(
            AppError::from(err).status(),
            axum::http::StatusCode::PAYMENT_REQUIRED
        );
    }

    #[tokio::test]
    async fn test_missing_catalog_blob_fails_copy() {
        let harness = TestHarness::new();
        let race = test_support::catalog_race("No Blob");
        harness.records.seed_catalog_race(race.clone());

        let err = handle(harness.state(), Uuid::new_v4(), command(&race))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::BlobStore(_)));
        assert_eq!(harness.records.race_plan_count(), 0);
    }
}
