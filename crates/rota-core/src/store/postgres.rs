//! PostgreSQL-backed store, a thin adapter over `rota_db::queries`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use rota_db::models::{Exercise, ExerciseSignature, ScheduledInstance, WorkoutPlan};
use rota_db::queries::exercises;
use rota_db::queries::instances::{self, InstanceFilter, InstancePatch, NewInstance};
use rota_db::queries::plans::{self, SlotMoveOutcome};
use rota_db::template::WeeklyTemplate;

use super::trait_def::{Catalog, InstanceRepository, PlanRepository};

/// Implements every storage trait over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InstanceRepository for PgStore {
    async fn create(&self, new: &NewInstance) -> Result<ScheduledInstance> {
        instances::insert_instance(&self.pool, new).await
    }

    async fn create_if_absent(&self, new: &NewInstance) -> Result<Option<ScheduledInstance>> {
        instances::insert_instance_if_absent(&self.pool, new).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledInstance>> {
        instances::get_instance(&self.pool, id).await
    }

    async fn update(&self, id: Uuid, patch: &InstancePatch) -> Result<Option<ScheduledInstance>> {
        instances::update_instance(&self.pool, id, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        instances::delete_instance(&self.pool, id).await
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &InstanceFilter,
    ) -> Result<Vec<ScheduledInstance>> {
        instances::list_instances_in_range(&self.pool, start, end, filter).await
    }

    async fn find_by_signature(
        &self,
        signature: &ExerciseSignature,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ScheduledInstance>> {
        instances::find_by_signature(&self.pool, signature, from, to).await
    }
}

#[async_trait]
impl PlanRepository for PgStore {
    async fn create_plan(
        &self,
        name: &str,
        week_starts_on: u8,
        template: &WeeklyTemplate,
    ) -> Result<WorkoutPlan> {
        plans::insert_plan(&self.pool, name, i16::from(week_starts_on), template).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<WorkoutPlan>> {
        plans::get_plan(&self.pool, id).await
    }

    async fn list_plans(&self) -> Result<Vec<WorkoutPlan>> {
        plans::list_plans(&self.pool).await
    }

    async fn update_template(
        &self,
        id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
    ) -> Result<Option<WorkoutPlan>> {
        plans::update_template(&self.pool, id, template, expected_version).await
    }

    async fn commit_slot_move(
        &self,
        plan_id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
        instance_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<SlotMoveOutcome> {
        plans::commit_slot_move(
            &self.pool,
            plan_id,
            template,
            expected_version,
            instance_id,
            new_date,
        )
        .await
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        exercises::get_exercise(&self.pool, exercise_id).await
    }
}
