//! Catalog staleness of an imported plan
//!
//! A plan snapshots the catalog race's `updated_at` when it is imported. The
//! plan is stale once the catalog race has been updated since.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::features::FeatureState;

#[derive(Debug, Clone, Copy)]
pub struct CatalogStatusQuery {
    pub plan_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatusResponse {
    pub plan_id: Uuid,
    pub catalog_race_id: Option<Uuid>,
    pub imported_at: Option<DateTime<Utc>>,
    pub current_updated_at: Option<DateTime<Utc>>,
    /// Whether the source catalog race still exists
    pub catalog_available: bool,
    pub stale: bool,
}

#[derive(Debug, Error)]
pub enum CatalogStatusError {
    #[error("Plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("Record store request failed: {0:#}")]
    RecordStore(#[source] anyhow::Error),
}

impl From<CatalogStatusError> for AppError {
    fn from(err: CatalogStatusError) -> Self {
        match err {
            CatalogStatusError::PlanNotFound(_) => AppError::NotFound(err.to_string()),
            CatalogStatusError::RecordStore(source) => {
                AppError::dependency("Failed to load the plan", source)
            },
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn handle(
    state: FeatureState,
    query: CatalogStatusQuery,
) -> Result<CatalogStatusResponse, CatalogStatusError> {
    let plan = state
        .records
        .get_race_plan(query.plan_id)
        .await
        .map_err(CatalogStatusError::RecordStore)?
        .filter(|plan| plan.user_id == query.user_id)
        .ok_or(CatalogStatusError::PlanNotFound(query.plan_id))?;

    let imported_at = plan.catalog_race_updated_at_at_import;

    let current = match plan.catalog_race_id {
        Some(race_id) => state
            .records
            .get_catalog_race(race_id)
            .await
            .map_err(CatalogStatusError::RecordStore)?,
        None => None,
    };

    let current_updated_at = current.as_ref().map(|race| race.updated_at);
    // Without an import timestamp the plan cannot prove it is current
    let stale = match current_updated_at {
        Some(current) => imported_at.map_or(true, |imported| current > imported),
        None => false,
    };

    Ok(CatalogStatusResponse {
        plan_id: plan.id,
        catalog_race_id: plan.catalog_race_id,
        imported_at,
        current_updated_at,
        catalog_available: current.is_some(),
        stale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RecordStore;
    use crate::features::plans::commands::{import_from_catalog, ImportFromCatalogCommand};
    use crate::models::CatalogGpxPatch;
    use crate::test_support::TestHarness;
    use racefuel_common::gpx::CourseStats;

    async fn imported(harness: &TestHarness, user_id: Uuid) -> (Uuid, Uuid) {
        let race = harness.seed_catalog_with_stations("Ridge Run", 1).await;
        let plan = import_from_catalog::handle(
            harness.state(),
            user_id,
            ImportFromCatalogCommand {
                catalog_race_id: race.id,
            },
        )
        .await
        .unwrap();
        (plan.id, race.id)
    }

    #[tokio::test]
    async fn test_fresh_import_is_current() {
        let harness = TestHarness::new();
        let user_id = Uuid::new_v4();
        let (plan_id, race_id) = imported(&harness, user_id).await;

        let status = handle(harness.state(), CatalogStatusQuery { plan_id, user_id })
            .await
            .unwrap();

        assert_eq!(status.catalog_race_id, Some(race_id));
        assert!(status.catalog_available);
        assert!(!status.stale);
        assert_eq!(status.imported_at, status.current_updated_at);
    }

    #[tokio::test]
    async fn test_catalog_update_marks_plan_stale() {
        let harness = TestHarness::new();
        let user_id = Uuid::new_v4();
        let (plan_id, race_id) = imported(&harness, user_id).await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let current = harness.records.get_catalog_race(race_id).await.unwrap().unwrap();
        harness
            .records
            .patch_catalog_race_gpx(
                race_id,
                &CatalogGpxPatch {
                    gpx_path: "catalog/new.gpx".to_string(),
                    gpx_hash: "new".to_string(),
                    stats: CourseStats {
                        distance_km: 50.0,
                        ..current.stats
                    },
                },
            )
            .await
            .unwrap();

        let status = handle(harness.state(), CatalogStatusQuery { plan_id, user_id })
            .await
            .unwrap();

        assert!(status.stale);
        assert!(status.current_updated_at > status.imported_at);
    }

    #[tokio::test]
    async fn test_removed_catalog_race_is_unavailable() {
        let harness = TestHarness::new();
        let user_id = Uuid::new_v4();
        let (plan_id, race_id) = imported(&harness, user_id).await;
        harness.records.remove_catalog_race(race_id);

        let status = handle(harness.state(), CatalogStatusQuery { plan_id, user_id })
            .await
            .unwrap();

        assert!(!status.catalog_available);
        assert!(!status.stale);
        assert_eq!(status.current_updated_at, None);
    }

    #[tokio::test]
    async fn test_other_users_plan_is_not_found() {
        let harness = TestHarness::new();
        let (plan_id, _) = imported(&harness, Uuid::new_v4()).await;

        let err = handle(
            harness.state(),
            CatalogStatusQuery {
                plan_id,
                user_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CatalogStatusError::PlanNotFound(_)));
    }
}
