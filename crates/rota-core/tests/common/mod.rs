//! Shared fixtures for engine tests against the in-memory store.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use rota_core::store::{
    ExerciseSignature, FixedClock, InstanceFilter, InstancePatch, InstanceRepository, MemoryStore,
    NewInstance, PlanRepository, ScheduledInstance, SlotMoveOutcome, WorkoutPlan,
};
use rota_core::{Scheduler, SchedulerConfig};
use rota_db::template::{DayTemplate, ExerciseTemplate, WeeklyTemplate};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Squat 3x10 @ 50.
pub fn squat() -> ExerciseTemplate {
    ExerciseTemplate {
        exercise_id: "squat".to_string(),
        sets: 3,
        reps: 10,
        weight: 50.0,
        duration: None,
        notes: None,
        order_index: 0,
    }
}

pub fn exercise(id: &str, order_index: i32) -> ExerciseTemplate {
    ExerciseTemplate {
        exercise_id: id.to_string(),
        order_index,
        ..squat()
    }
}

/// A template with the given exercises on the given weekdays.
pub fn template(days: Vec<(u8, Vec<ExerciseTemplate>)>) -> WeeklyTemplate {
    WeeklyTemplate {
        days: days
            .into_iter()
            .map(|(day_of_week, exercise_templates)| DayTemplate {
                exercise_templates,
                ..DayTemplate::empty(day_of_week)
            })
            .collect(),
    }
}

/// No background regeneration unless a test opts in.
pub fn quiet_config() -> SchedulerConfig {
    SchedulerConfig {
        horizon_days: 0,
        ..SchedulerConfig::default()
    }
}

/// Store seeded with a small catalog.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_exercise("squat", "Back Squat", "legs").await;
    store.add_exercise("bench", "Bench Press", "chest").await;
    store.add_exercise("row", "Barbell Row", "back").await;
    store
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub scheduler: Scheduler,
    pub plan: WorkoutPlan,
}

impl Fixture {
    pub async fn new(template: WeeklyTemplate) -> Self {
        Self::with_config(template, quiet_config(), d(2025, 1, 6)).await
    }

    pub async fn with_config(
        template: WeeklyTemplate,
        config: SchedulerConfig,
        today: NaiveDate,
    ) -> Self {
        let store = seeded_store().await;
        let plan = store.create_plan("test plan", 1, &template).await.unwrap();
        let scheduler =
            Scheduler::with_memory(store.clone(), Arc::new(FixedClock::on(today)), config);
        Self {
            store,
            scheduler,
            plan,
        }
    }

    /// Visible instances of the plan in `[from, to]`.
    pub async fn visible(&self, from: NaiveDate, to: NaiveDate) -> Vec<ScheduledInstance> {
        self.scheduler
            .list_instances(
                from,
                to,
                &InstanceFilter {
                    workout_plan_id: Some(self.plan.id),
                    ..InstanceFilter::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn instance_on(&self, date: NaiveDate, exercise_id: &str) -> ScheduledInstance {
        self.visible(date, date)
            .await
            .into_iter()
            .find(|i| i.exercise_id == exercise_id)
            .unwrap_or_else(|| panic!("no visible {exercise_id} on {date}"))
    }

    pub async fn current_template(&self) -> WeeklyTemplate {
        self.scheduler
            .get_plan(self.plan.id)
            .await
            .unwrap()
            .template()
            .clone()
    }
}

pub fn dates_of(instances: &[ScheduledInstance]) -> Vec<NaiveDate> {
    instances.iter().map(|i| i.date).collect()
}

// ---------------------------------------------------------------------------
// Fault-injecting wrappers
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`] but fails updates of selected instances.
pub struct FailingUpdates {
    pub inner: Arc<MemoryStore>,
    pub fail: Mutex<HashSet<Uuid>>,
}

impl FailingUpdates {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_on(&self, id: Uuid) {
        self.fail.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl InstanceRepository for FailingUpdates {
    async fn create(&self, new: &NewInstance) -> Result<ScheduledInstance> {
        self.inner.create(new).await
    }

    async fn create_if_absent(&self, new: &NewInstance) -> Result<Option<ScheduledInstance>> {
        self.inner.create_if_absent(new).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledInstance>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: Uuid, patch: &InstancePatch) -> Result<Option<ScheduledInstance>> {
        if self.fail.lock().unwrap().contains(&id) {
            bail!("injected failure for {id}");
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &InstanceFilter,
    ) -> Result<Vec<ScheduledInstance>> {
        self.inner.find_by_date_range(start, end, filter).await
    }

    async fn find_by_signature(
        &self,
        signature: &ExerciseSignature,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ScheduledInstance>> {
        self.inner.find_by_signature(signature, from, to).await
    }
}

/// Delegates to a [`MemoryStore`] but reports a version conflict on every
/// slot move, counting attempts.
pub struct AlwaysStale {
    pub inner: Arc<MemoryStore>,
    pub attempts: Mutex<u32>,
}

#[async_trait]
impl PlanRepository for AlwaysStale {
    async fn create_plan(
        &self,
        name: &str,
        week_starts_on: u8,
        template: &WeeklyTemplate,
    ) -> Result<WorkoutPlan> {
        self.inner.create_plan(name, week_starts_on, template).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<WorkoutPlan>> {
        self.inner.get_by_id(id).await
    }

    async fn list_plans(&self) -> Result<Vec<WorkoutPlan>> {
        self.inner.list_plans().await
    }

    async fn update_template(
        &self,
        id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
    ) -> Result<Option<WorkoutPlan>> {
        self.inner.update_template(id, template, expected_version).await
    }

    async fn commit_slot_move(
        &self,
        _plan_id: Uuid,
        _template: &WeeklyTemplate,
        _expected_version: i64,
        _instance_id: Uuid,
        _new_date: NaiveDate,
    ) -> Result<SlotMoveOutcome> {
        *self.attempts.lock().unwrap() += 1;
        Ok(SlotMoveOutcome::VersionConflict)
    }
}
