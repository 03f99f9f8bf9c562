//! Plan entitlement check
//!
//! Billing decides how many plans a user may hold. This service only asks
//! a [`PlanQuota`] before creating one; [`RecordCountQuota`] answers from
//! the record store with a single configured ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Exhausted { limit: u32 },
}

#[async_trait]
pub trait PlanQuota: Send + Sync {
    async fn check(&self, user_id: Uuid) -> anyhow::Result<QuotaDecision>;
}

/// Counts existing plans against `max_per_user`; `None` never exhausts
pub struct RecordCountQuota {
    records: Arc<dyn RecordStore>,
    max_per_user: Option<u32>,
}

impl RecordCountQuota {
    pub fn new(records: Arc<dyn RecordStore>, max_per_user: Option<u32>) -> Self {
        Self {
            records,
            max_per_user,
        }
    }
}

#[async_trait]
impl PlanQuota for RecordCountQuota {
    async fn check(&self, user_id: Uuid) -> anyhow::Result<QuotaDecision> {
        let Some(limit) = self.max_per_user else {
            return Ok(QuotaDecision::Allowed);
        };

        let count = self.records.count_plans_for_user(user_id).await?;
        tracing::debug!(user_id = %user_id, count, limit, "Plan quota checked");

        if count >= i64::from(limit) {
            Ok(QuotaDecision::Exhausted { limit })
        } else {
            Ok(QuotaDecision::Allowed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{InMemoryRecordStore, RecordOp};
    use crate::models::{NewRacePlan, PlannerValues};

    async fn store_with_plans(user_id: Uuid, count: usize) -> Arc<InMemoryRecordStore> {
        let store = Arc::new(InMemoryRecordStore::new());
        for i in 0..count {
            store
                .insert_race_plan(&NewRacePlan {
                    id: Uuid::new_v4(),
                    user_id,
                    name: format!("Plan {}", i),
                    catalog_race_id: None,
                    gpx_path: None,
                    course_stats: None,
                    planner_values: PlannerValues {
                        aid_stations: Vec::new(),
                        course_distance_km: 0.0,
                        elevation_gain_m: 0.0,
                        elevation_loss_m: 0.0,
                    },
                    catalog_race_updated_at_at_import: None,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_unlimited_skips_the_store() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.fail_on(RecordOp::CountPlans);
        let quota = RecordCountQuota::new(store, None);

        assert_eq!(
            quota.check(Uuid::new_v4()).await.unwrap(),
            QuotaDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_exhausted_at_limit() {
        let user_id = Uuid::new_v4();
        let quota = RecordCountQuota::new(store_with_plans(user_id, 2).await, Some(2));

        assert_eq!(
            quota.check(user_id).await.unwrap(),
            QuotaDecision::Exhausted { limit: 2 }
        );
    }

    #[tokio::test]
    async fn test_allowed_below_limit_and_for_other_users() {
        let user_id = Uuid::new_v4();
        let quota = RecordCountQuota::new(store_with_plans(user_id, 1).await, Some(2));

        assert_eq!(quota.check(user_id).await.unwrap(), QuotaDecision::Allowed);
        assert_eq!(
            quota.check(Uuid::new_v4()).await.unwrap(),
            QuotaDecision::Allowed
        );
    }
}
