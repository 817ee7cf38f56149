//! The [`Scheduler`] facade: one handle bundling the stores, the clock and
//! the engine configuration.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use rota_db::models::{ScheduledInstance, WorkoutPlan};
use rota_db::queries::instances::InstanceFilter;

use crate::error::{NotFoundKind, Result, ScheduleError};
use crate::generate::{self, GenerationReport};
use crate::instances::{self, NewAdHocInstance};
use crate::plan_file::{self, PlanFile};
use crate::reschedule::{self, RescheduleReport, RescheduleScope};
use crate::store::{Catalog, Clock, InstanceRepository, MemoryStore, PgStore, PlanRepository};
use crate::{completion, dates};

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Days past today regenerated in the background after a whole-plan
    /// move. 0 disables background regeneration.
    pub horizon_days: u32,
    /// Week start for instances without a plan (0 = Sunday).
    pub default_week_starts_on: u8,
    /// Maximum concurrent cascaded updates.
    pub cascade_concurrency: usize,
    /// Attempts at the template compare-and-swap before giving up.
    pub template_retry_limit: u32,
    /// Longest range, in days, accepted by generation and listing.
    pub max_generation_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 28,
            default_week_starts_on: 1,
            cascade_concurrency: 8,
            template_retry_limit: 3,
            max_generation_days: 366,
        }
    }
}

/// Entry point to every scheduling operation.
#[derive(Clone)]
pub struct Scheduler {
    instances: Arc<dyn InstanceRepository>,
    plans: Arc<dyn PlanRepository>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    background: TaskTracker,
}

impl Scheduler {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        plans: Arc<dyn PlanRepository>,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            instances,
            plans,
            catalog,
            clock,
            config,
            background: TaskTracker::new(),
        }
    }

    /// A scheduler backed entirely by one PostgreSQL store.
    pub fn with_pg(store: PgStore, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, clock, config)
    }

    /// A scheduler backed entirely by one in-memory store.
    pub fn with_memory(
        store: Arc<MemoryStore>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self::new(store.clone(), store.clone(), store, clock, config)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<WorkoutPlan> {
        self.plans
            .get_by_id(plan_id)
            .await?
            .ok_or(ScheduleError::NotFound(NotFoundKind::Plan(plan_id)))
    }

    pub async fn list_plans(&self) -> Result<Vec<WorkoutPlan>> {
        Ok(self.plans.list_plans().await?)
    }

    pub async fn create_plan(&self, file: &PlanFile) -> Result<WorkoutPlan> {
        plan_file::create_plan_from_file(self.plans.as_ref(), self.catalog.as_ref(), file).await
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    pub async fn ensure_generated(
        &self,
        plan_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<GenerationReport> {
        generate::ensure_generated(
            self.plans.as_ref(),
            self.instances.as_ref(),
            self.catalog.as_ref(),
            plan_id,
            from,
            to,
            self.config.max_generation_days,
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Rescheduling
    // -----------------------------------------------------------------------

    /// Move an instance. After a whole-plan move the plan's horizon is
    /// regenerated in the background; see [`Self::drain_background`].
    pub async fn reschedule(
        &self,
        instance_id: Uuid,
        new_date: NaiveDate,
        scope: RescheduleScope,
    ) -> Result<RescheduleReport> {
        let report = reschedule::reschedule(
            self.plans.as_ref(),
            self.instances.as_ref(),
            &self.config,
            instance_id,
            new_date,
            scope,
        )
        .await?;

        if scope == RescheduleScope::WholePlan {
            if let Some(plan_id) = report.instance.workout_plan_id {
                self.spawn_regeneration(plan_id);
            }
        }

        Ok(report)
    }

    fn spawn_regeneration(&self, plan_id: Uuid) {
        if self.config.horizon_days == 0 {
            return;
        }
        let from = self.clock.today();
        let to = dates::shift_by_days(from, i64::from(self.config.horizon_days));
        let scheduler = self.clone();

        self.background.spawn(async move {
            match scheduler.ensure_generated(plan_id, from, to).await {
                Ok(report) => tracing::debug!(
                    plan_id = %plan_id,
                    created = report.created,
                    "background regeneration finished"
                ),
                Err(e) => tracing::warn!(
                    plan_id = %plan_id,
                    error = %e,
                    "background regeneration failed"
                ),
            }
        });
    }

    /// Wait for every background regeneration spawned so far.
    pub async fn drain_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    pub async fn mark_completed(&self, instance_id: Uuid) -> Result<ScheduledInstance> {
        completion::mark_completed(self.instances.as_ref(), self.clock.as_ref(), instance_id).await
    }

    pub async fn mark_incomplete(&self, instance_id: Uuid) -> Result<ScheduledInstance> {
        completion::mark_incomplete(self.instances.as_ref(), instance_id).await
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    pub async fn create_ad_hoc(&self, new: NewAdHocInstance) -> Result<ScheduledInstance> {
        instances::create_ad_hoc(self.instances.as_ref(), self.catalog.as_ref(), new).await
    }

    pub async fn get_instance(&self, instance_id: Uuid) -> Result<ScheduledInstance> {
        instances::get_instance(self.instances.as_ref(), instance_id).await
    }

    pub async fn list_instances(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        filter: &InstanceFilter,
    ) -> Result<Vec<ScheduledInstance>> {
        instances::list_instances(
            self.instances.as_ref(),
            from,
            to,
            filter,
            self.config.max_generation_days,
        )
        .await
    }

    pub async fn delete_instance(&self, instance_id: Uuid) -> Result<()> {
        instances::delete_instance(self.instances.as_ref(), instance_id).await
    }
}
