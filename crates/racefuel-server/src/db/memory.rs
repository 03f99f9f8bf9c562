//! In-memory [`RecordStore`] for tests and local development
//!
//! Tables are `HashMap`/`Vec` behind `std::sync::RwLock`. Each operation can
//! be made to fail on demand, and seeding helpers let tests set up catalog
//! races without going through ingestion.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::RecordStore;
use crate::models::{
    AidStationTemplate, CatalogGpxPatch, CatalogRace, NewCatalogRace, NewPlanAidStation,
    NewRacePlan, RacePlan,
};

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOp {
    InsertCatalogRace,
    PatchCatalogRace,
    GetCatalogRace,
    ListAidStationTemplates,
    InsertRacePlan,
    DeleteRacePlan,
    GetRacePlan,
    InsertPlanAidStations,
    CountPlans,
}

#[derive(Debug, Clone)]
struct StoredPlanAidStation {
    plan_id: Uuid,
    station: NewPlanAidStation,
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    catalog: RwLock<HashMap<Uuid, CatalogRace>>,
    templates: RwLock<Vec<AidStationTemplate>>,
    plans: RwLock<HashMap<Uuid, RacePlan>>,
    plan_aid_stations: RwLock<Vec<StoredPlanAidStation>>,
    failing: RwLock<HashSet<RecordOp>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: RecordOp) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    pub fn recover(&self, op: RecordOp) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    pub fn seed_catalog_race(&self, race: CatalogRace) {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(race.id, race);
    }

    pub fn seed_aid_station_templates(&self, templates: impl IntoIterator<Item = AidStationTemplate>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(templates);
    }

    /// Drop a catalog race as a concurrent writer would
    pub fn remove_catalog_race(&self, id: Uuid) -> Option<CatalogRace> {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn catalog_race_count(&self) -> usize {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn race_plan_count(&self) -> usize {
        self.plans.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn plan_aid_station_count(&self, plan_id: Uuid) -> usize {
        self.plan_aid_stations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|row| row.plan_id == plan_id)
            .count()
    }

    fn check(&self, op: RecordOp) -> Result<()> {
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op)
        {
            bail!("injected {:?} failure", op);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_catalog_race(&self, race: &NewCatalogRace) -> Result<CatalogRace> {
        self.check(RecordOp::InsertCatalogRace)?;

        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        if catalog.contains_key(&race.id) {
            bail!("duplicate key value violates unique constraint \"race_catalog_pkey\"");
        }

        let now = Utc::now();
        let record = CatalogRace {
            id: race.id,
            name: race.metadata.name.clone(),
            location: race.metadata.location.clone(),
            race_date: race.metadata.race_date,
            description: race.metadata.description.clone(),
            is_live: race.metadata.is_live,
            gpx_path: race.gpx_path.clone(),
            gpx_hash: race.gpx_hash.clone(),
            stats: race.stats.clone(),
            created_at: now,
            updated_at: now,
        };
        catalog.insert(record.id, record.clone());

        Ok(record)
    }

    async fn patch_catalog_race_gpx(
        &self,
        id: Uuid,
        patch: &CatalogGpxPatch,
    ) -> Result<Option<CatalogRace>> {
        self.check(RecordOp::PatchCatalogRace)?;

        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        Ok(catalog.get_mut(&id).map(|race| {
            race.gpx_path = patch.gpx_path.clone();
            race.gpx_hash = patch.gpx_hash.clone();
            race.stats = patch.stats.clone();
            race.updated_at = Utc::now();
            race.clone()
        }))
    }

    async fn get_catalog_race(&self, id: Uuid) -> Result<Option<CatalogRace>> {
        self.check(RecordOp::GetCatalogRace)?;
        Ok(self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn list_aid_station_templates(
        &self,
        catalog_race_id: Uuid,
    ) -> Result<Vec<AidStationTemplate>> {
        self.check(RecordOp::ListAidStationTemplates)?;

        let mut templates: Vec<AidStationTemplate> = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.catalog_race_id == catalog_race_id)
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.order_index);

        Ok(templates)
    }

    async fn insert_race_plan(&self, plan: &NewRacePlan) -> Result<RacePlan> {
        self.check(RecordOp::InsertRacePlan)?;

        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        if plans.contains_key(&plan.id) {
            bail!("duplicate key value violates unique constraint \"race_plans_pkey\"");
        }

        let record = RacePlan {
            id: plan.id,
            user_id: plan.user_id,
            name: plan.name.clone(),
            catalog_race_id: plan.catalog_race_id,
            gpx_path: plan.gpx_path.clone(),
            course_stats: plan.course_stats.clone(),
            planner_values: plan.planner_values.clone(),
            catalog_race_updated_at_at_import: plan.catalog_race_updated_at_at_import,
            created_at: Utc::now(),
        };
        plans.insert(record.id, record.clone());

        Ok(record)
    }

    async fn delete_race_plan(&self, id: Uuid) -> Result<()> {
        self.check(RecordOp::DeleteRacePlan)?;

        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        self.plan_aid_stations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|row| row.plan_id != id);

        Ok(())
    }

    async fn get_race_plan(&self, id: Uuid) -> Result<Option<RacePlan>> {
        self.check(RecordOp::GetRacePlan)?;
        Ok(self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn insert_plan_aid_stations(
        &self,
        plan_id: Uuid,
        stations: &[NewPlanAidStation],
    ) -> Result<u64> {
        self.check(RecordOp::InsertPlanAidStations)?;

        if !self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&plan_id)
        {
            bail!("insert violates foreign key constraint \"plan_aid_stations_plan_id_fkey\"");
        }

        self.plan_aid_stations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(stations.iter().cloned().map(|station| StoredPlanAidStation {
                plan_id,
                station,
            }));

        Ok(stations.len() as u64)
    }

    async fn count_plans_for_user(&self, user_id: Uuid) -> Result<i64> {
        self.check(RecordOp::CountPlans)?;
        Ok(self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|plan| plan.user_id == user_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogMetadata, PlannerValues};
    use racefuel_common::gpx::CourseStats;

    fn stats() -> CourseStats {
        CourseStats {
            distance_km: 10.0,
            elevation_gain_m: 100.0,
            elevation_loss_m: 90.0,
            min_alt_m: None,
            max_alt_m: None,
            start_lat: Some(45.0),
            start_lng: Some(6.0),
            bounds_min_lat: Some(45.0),
            bounds_min_lng: Some(6.0),
            bounds_max_lat: Some(45.1),
            bounds_max_lng: Some(6.1),
        }
    }

    fn new_race() -> NewCatalogRace {
        NewCatalogRace {
            id: Uuid::new_v4(),
            metadata: CatalogMetadata {
                name: "Ultra".to_string(),
                location: None,
                race_date: None,
                description: None,
                is_live: false,
            },
            gpx_path: "catalog/a/1.gpx".to_string(),
            gpx_hash: "00".to_string(),
            stats: stats(),
        }
    }

    fn new_plan(user_id: Uuid) -> NewRacePlan {
        NewRacePlan {
            id: Uuid::new_v4(),
            user_id,
            name: "My plan".to_string(),
            catalog_race_id: None,
            gpx_path: None,
            course_stats: None,
            planner_values: PlannerValues {
                aid_stations: vec![],
                course_distance_km: 0.0,
                elevation_gain_m: 0.0,
                elevation_loss_m: 0.0,
            },
            catalog_race_updated_at_at_import: None,
        }
    }

    #[tokio::test]
    async fn test_patch_missing_race_returns_none() {
        let store = InMemoryRecordStore::new();
        let patch = CatalogGpxPatch {
            gpx_path: "catalog/b/2.gpx".to_string(),
            gpx_hash: "11".to_string(),
            stats: stats(),
        };
        assert!(store
            .patch_catalog_race_gpx(Uuid::new_v4(), &patch)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_patch_bumps_updated_at() {
        let store = InMemoryRecordStore::new();
        let created = store.insert_catalog_race(&new_race()).await.unwrap();
        let patch = CatalogGpxPatch {
            gpx_path: "catalog/a/2.gpx".to_string(),
            gpx_hash: "22".to_string(),
            stats: stats(),
        };
        let patched = store
            .patch_catalog_race_gpx(created.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.gpx_path, "catalog/a/2.gpx");
        assert!(patched.updated_at >= created.updated_at);
        assert_eq!(patched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let store = InMemoryRecordStore::new();
        let race = new_race();
        store.insert_catalog_race(&race).await.unwrap();
        assert!(store.insert_catalog_race(&race).await.is_err());
        assert_eq!(store.catalog_race_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_plan_cascades_aid_stations() {
        let store = InMemoryRecordStore::new();
        let user = Uuid::new_v4();
        let plan = store.insert_race_plan(&new_plan(user)).await.unwrap();
        let station = NewPlanAidStation {
            name: "Refuge".to_string(),
            distance_km: 5.0,
            water_available: true,
            notes: None,
            order_index: 0,
        };
        assert_eq!(
            store
                .insert_plan_aid_stations(plan.id, &[station.clone(), station])
                .await
                .unwrap(),
            2
        );
        assert_eq!(store.count_plans_for_user(user).await.unwrap(), 1);

        store.delete_race_plan(plan.id).await.unwrap();
        assert_eq!(store.plan_aid_station_count(plan.id), 0);
        assert!(store.get_race_plan(plan.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_aid_stations_require_plan() {
        let store = InMemoryRecordStore::new();
        let station = NewPlanAidStation {
            name: "Orphan".to_string(),
            distance_km: 1.0,
            water_available: false,
            notes: None,
            order_index: 0,
        };
        assert!(store
            .insert_plan_aid_stations(Uuid::new_v4(), &[station])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_templates_sorted_by_order_index() {
        let store = InMemoryRecordStore::new();
        let race_id = Uuid::new_v4();
        let template = |name: &str, order_index: i32| AidStationTemplate {
            id: Uuid::new_v4(),
            catalog_race_id: race_id,
            name: name.to_string(),
            distance_km: order_index as f64 * 10.0,
            water_available: true,
            notes: None,
            order_index,
        };
        store.seed_aid_station_templates([template("second", 1), template("first", 0)]);

        let names: Vec<_> = store
            .list_aid_station_templates(race_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
