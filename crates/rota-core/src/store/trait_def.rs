//! Repository, catalog and clock traits.
//!
//! All traits are object-safe so the scheduler can hold them as
//! `Arc<dyn ...>` and tests can swap in the in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use rota_db::models::{Exercise, ExerciseSignature, ScheduledInstance, WorkoutPlan};
use rota_db::queries::instances::{InstanceFilter, InstancePatch, NewInstance};
use rota_db::queries::plans::SlotMoveOutcome;
use rota_db::template::WeeklyTemplate;

/// Persistence for dated instances, keyed by instance id.
///
/// Implementations must enforce two unique constraints:
/// - visible plan instances: `(workout_plan_id, exercise_id, sets, reps,
///   weight, date)`
/// - hidden tombstones: `(workout_plan_id, exercise_id, date)`
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert an instance, failing on a unique-constraint collision
    /// (detectable with [`super::is_unique_violation`]).
    async fn create(&self, new: &NewInstance) -> Result<ScheduledInstance>;

    /// Insert an instance unless a conflicting row exists. `None` means the
    /// insert was suppressed.
    async fn create_if_absent(&self, new: &NewInstance) -> Result<Option<ScheduledInstance>>;

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledInstance>>;

    /// Apply a partial update. `None` when the instance does not exist or the
    /// patch's `require_incomplete` guard refused it.
    async fn update(&self, id: Uuid, patch: &InstancePatch) -> Result<Option<ScheduledInstance>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Instances dated within `[start, end]`, ordered by date then creation.
    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &InstanceFilter,
    ) -> Result<Vec<ScheduledInstance>>;

    /// Visible instances of one recurring slot dated `>= from` (and `<= to`).
    async fn find_by_signature(
        &self,
        signature: &ExerciseSignature,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ScheduledInstance>>;
}

/// Persistence for plans and their weekly templates.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn create_plan(
        &self,
        name: &str,
        week_starts_on: u8,
        template: &WeeklyTemplate,
    ) -> Result<WorkoutPlan>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<WorkoutPlan>>;

    async fn list_plans(&self) -> Result<Vec<WorkoutPlan>>;

    /// Compare-and-swap the template. `None` when `expected_version` is stale
    /// or the plan is gone.
    async fn update_template(
        &self,
        id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
    ) -> Result<Option<WorkoutPlan>>;

    /// Compare-and-swap the template and move one uncompleted, visible
    /// instance to `new_date`, atomically.
    async fn commit_slot_move(
        &self,
        plan_id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
        instance_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<SlotMoveOutcome>;
}

/// Exercise metadata lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::default()).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

const _: () = {
    fn _assert_object_safe(
        _: &dyn InstanceRepository,
        _: &dyn PlanRepository,
        _: &dyn Catalog,
        _: &dyn Clock,
    ) {
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_its_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let clock = FixedClock::on(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn clocks_work_as_trait_objects() {
        let clocks: Vec<Box<dyn Clock>> = vec![
            Box::new(SystemClock),
            Box::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())),
        ];
        for clock in &clocks {
            assert_eq!(clock.today(), clock.now().date_naive());
        }
    }
}
