//! Moving scheduled instances, either one occurrence or the whole recurring
//! slot.
//!
//! ```text
//! this_week   detach one occurrence within its calendar week; the template
//!             is untouched and a hidden tombstone marks the vacated date
//! whole_plan  move the template slot to the new weekday, move the instance,
//!             then shift later uncompleted occurrences by the same delta
//! ```
//!
//! For `whole_plan`, the template write and the primary move commit together
//! or not at all. The cascade that follows is best-effort: failures are
//! collected in the [`RescheduleReport`] and nothing already moved is rolled
//! back.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rota_db::models::{ExerciseSignature, ScheduledInstance, WorkoutPlan};
use rota_db::queries::instances::{InstancePatch, NewInstance};
use rota_db::queries::plans::SlotMoveOutcome;
use rota_db::template::{WeeklyTemplate, weekday_name};

use crate::dates;
use crate::error::{NotFoundKind, Result, ScheduleError};
use crate::scheduler::SchedulerConfig;
use crate::store::{InstanceRepository, PlanRepository, is_unique_violation};

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// How far a reschedule reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleScope {
    ThisWeek,
    WholePlan,
}

impl fmt::Display for RescheduleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ThisWeek => "this_week",
            Self::WholePlan => "whole_plan",
        };
        f.write_str(s)
    }
}

impl FromStr for RescheduleScope {
    type Err = RescheduleScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "this_week" => Ok(Self::ThisWeek),
            "whole_plan" => Ok(Self::WholePlan),
            other => Err(RescheduleScopeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`RescheduleScope`] string.
#[derive(Debug, Clone)]
pub struct RescheduleScopeParseError(pub String);

impl fmt::Display for RescheduleScopeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid reschedule scope: {:?} (expected this_week or whole_plan)",
            self.0
        )
    }
}

impl std::error::Error for RescheduleScopeParseError {}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A cascaded move that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeFailure {
    pub instance_id: Uuid,
    pub error: String,
}

/// What a reschedule changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescheduleReport {
    pub scope: RescheduleScope,
    /// The rescheduled instance, after the move.
    pub instance: ScheduledInstance,
    /// Tombstone left at the original date (this-week moves of template
    /// occurrences only).
    pub tombstone: Option<ScheduledInstance>,
    /// Days every cascaded occurrence was shifted by.
    pub day_shift: i64,
    /// Later occurrences moved along with the slot.
    pub cascaded: Vec<Uuid>,
    /// Occurrences that were completed or removed before the cascade reached
    /// them.
    pub skipped: Vec<Uuid>,
    pub failed: Vec<CascadeFailure>,
}

impl RescheduleReport {
    fn single(scope: RescheduleScope, instance: ScheduledInstance) -> Self {
        Self {
            scope,
            instance,
            tombstone: None,
            day_shift: 0,
            cascaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of instances whose date changed, the primary one included.
    pub fn moved(&self) -> usize {
        1 + self.cascaded.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn cascade failures into [`ScheduleError::PartialCascade`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(ScheduleError::PartialCascade {
            moved: self.moved(),
            failed: self
                .failed
                .into_iter()
                .map(|f| (f.instance_id, f.error))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Move `instance_id` to `new_date` with the given scope.
pub async fn reschedule(
    plans: &dyn PlanRepository,
    instances: &dyn InstanceRepository,
    config: &SchedulerConfig,
    instance_id: Uuid,
    new_date: NaiveDate,
    scope: RescheduleScope,
) -> Result<RescheduleReport> {
    let instance = instances
        .get(instance_id)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Instance(instance_id)))?;

    if instance.is_hidden {
        return Err(ScheduleError::validation(format!(
            "instance {instance_id} is a hidden tombstone and cannot be rescheduled"
        )));
    }
    if instance.completed {
        return Err(ScheduleError::validation(format!(
            "instance {instance_id} is completed and cannot be rescheduled"
        )));
    }
    if instance.date == new_date {
        return Err(ScheduleError::validation(format!(
            "instance {instance_id} is already scheduled on {new_date}"
        )));
    }

    let plan = match instance.workout_plan_id {
        Some(plan_id) => Some(
            plans
                .get_by_id(plan_id)
                .await?
                .ok_or(ScheduleError::NotFound(NotFoundKind::Plan(plan_id)))?,
        ),
        None => None,
    };

    let report = match scope {
        RescheduleScope::ThisWeek => {
            move_this_week(instances, config, instance, plan.as_ref(), new_date).await?
        }
        RescheduleScope::WholePlan => {
            let Some(plan) = plan else {
                return Err(ScheduleError::validation(format!(
                    "instance {instance_id} is not part of a plan; only this_week moves apply"
                )));
            };
            move_whole_plan(plans, instances, config, instance, plan, new_date).await?
        }
    };

    tracing::info!(
        instance_id = %instance_id,
        %new_date,
        scope = %scope,
        moved = report.moved(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "rescheduled instance"
    );

    Ok(report)
}

/// Map a failed instance write to a scheduling error.
fn write_error(err: anyhow::Error, instance_id: Uuid, new_date: NaiveDate) -> ScheduleError {
    if is_unique_violation(&err) {
        ScheduleError::Conflict(format!(
            "instance {instance_id} cannot move to {new_date}: an identical occurrence is already scheduled there"
        ))
    } else {
        ScheduleError::Repository(err)
    }
}

/// Explain why a guarded move of the primary instance did not apply.
async fn unavailable(instances: &dyn InstanceRepository, instance_id: Uuid) -> ScheduleError {
    match instances.get(instance_id).await {
        Ok(None) => ScheduleError::NotFound(NotFoundKind::Instance(instance_id)),
        Ok(Some(_)) => ScheduleError::Conflict(format!(
            "instance {instance_id} was completed concurrently"
        )),
        Err(err) => ScheduleError::Repository(err),
    }
}

async fn move_this_week(
    instances: &dyn InstanceRepository,
    config: &SchedulerConfig,
    instance: ScheduledInstance,
    plan: Option<&WorkoutPlan>,
    new_date: NaiveDate,
) -> Result<RescheduleReport> {
    let week_start = plan.map_or(config.default_week_starts_on, WorkoutPlan::week_start);
    if !dates::same_week(instance.date, new_date, week_start) {
        return Err(ScheduleError::validation(format!(
            "{new_date} is not in the same week as {} (week starts on {})",
            instance.date,
            rota_db::template::weekday_name(week_start)
        )));
    }

    // The tombstone goes in first so a concurrent generator never sees the
    // vacated date as unhandled.
    let tombstone = match plan {
        Some(_) => {
            instances
                .create_if_absent(&NewInstance::tombstone_for(&instance))
                .await?
        }
        None => None,
    };

    let patch = InstancePatch {
        require_incomplete: true,
        ..InstancePatch::move_to(new_date)
    };
    let moved = instances.update(instance.id, &patch).await;

    let outcome = match moved {
        Ok(Some(moved)) => Ok(moved),
        Ok(None) => Err(unavailable(instances, instance.id).await),
        Err(err) => Err(write_error(err, instance.id, new_date)),
    };

    match outcome {
        Ok(moved) => {
            let mut report = RescheduleReport::single(RescheduleScope::ThisWeek, moved);
            report.tombstone = tombstone;
            Ok(report)
        }
        Err(err) => {
            if let Some(tombstone) = tombstone {
                if let Err(cleanup) = instances.delete(tombstone.id).await {
                    tracing::warn!(
                        tombstone_id = %tombstone.id,
                        error = %cleanup,
                        "failed to remove tombstone after aborted move"
                    );
                }
            }
            Err(err)
        }
    }
}

async fn move_whole_plan(
    plans: &dyn PlanRepository,
    instances: &dyn InstanceRepository,
    config: &SchedulerConfig,
    instance: ScheduledInstance,
    plan: WorkoutPlan,
    new_date: NaiveDate,
) -> Result<RescheduleReport> {
    let source_dow = dates::day_of_week(instance.date);
    let target_dow = dates::day_of_week(new_date);

    let attempts = config.template_retry_limit.max(1);
    let mut plan = plan;
    let mut attempt = 1;
    let (moved, template) = loop {
        let mut template = plan.template().clone();
        let source = template
            .day_mut(source_dow)
            .ok_or(ScheduleError::NotFound(NotFoundKind::TemplateNotFound {
                plan_id: plan.id,
                day_of_week: source_dow,
            }))?;
        let slot = source
            .take_matching(
                &instance.exercise_id,
                instance.sets,
                instance.reps,
                instance.weight,
            )
            .ok_or_else(|| {
                ScheduleError::NotFound(NotFoundKind::ExerciseTemplateNotFound {
                    plan_id: plan.id,
                    exercise_id: instance.exercise_id.clone(),
                })
            })?;
        let occupied = template.day(target_dow).is_some_and(|day| {
            day.exercise_templates
                .iter()
                .any(|et| et.matches(&slot.exercise_id, slot.sets, slot.reps, slot.weight))
        });
        if occupied {
            return Err(ScheduleError::validation(format!(
                "{} already holds {} {}x{}@{}; moving another identical slot there would duplicate it",
                weekday_name(target_dow),
                slot.exercise_id,
                slot.sets,
                slot.reps,
                slot.weight
            )));
        }
        template.day_or_insert(target_dow).append(slot);
        template
            .validate()
            .map_err(|err| ScheduleError::validation(format!("moved template is invalid: {err}")))?;

        let outcome = plans
            .commit_slot_move(
                plan.id,
                &template,
                plan.template_version,
                instance.id,
                new_date,
            )
            .await
            .map_err(|err| write_error(err, instance.id, new_date))?;

        match outcome {
            SlotMoveOutcome::Committed { instance, .. } => break (instance, template),
            SlotMoveOutcome::InstanceUnavailable => {
                return Err(unavailable(instances, instance.id).await);
            }
            SlotMoveOutcome::VersionConflict => {
                tracing::debug!(
                    plan_id = %plan.id,
                    attempt,
                    "template version changed underneath whole-plan move"
                );
                if attempt >= attempts {
                    return Err(ScheduleError::Conflict(format!(
                        "template of plan {} kept changing; gave up after {attempts} attempt(s)",
                        plan.id
                    )));
                }
                attempt += 1;
                plan = plans
                    .get_by_id(plan.id)
                    .await?
                    .ok_or(ScheduleError::NotFound(NotFoundKind::Plan(plan.id)))?;
            }
        }
    };

    let day_shift = dates::day_shift(source_dow, target_dow);
    let mut report = RescheduleReport::single(RescheduleScope::WholePlan, moved);
    report.day_shift = day_shift;
    if day_shift != 0 {
        cascade(instances, config, &instance, &template, day_shift, &mut report).await?;
    }
    Ok(report)
}

enum CascadeOutcome {
    Moved(Uuid),
    Skipped(Uuid),
    Failed(CascadeFailure),
}

/// Shift the slot's later uncompleted occurrences by `day_shift` days.
///
/// Occurrences sitting on a weekday that still holds an identical slot in
/// the committed template belong to that slot and stay put. Everything else
/// follows the moved slot, including occurrences a this-week move had
/// already pushed off the old weekday.
async fn cascade(
    instances: &dyn InstanceRepository,
    config: &SchedulerConfig,
    original: &ScheduledInstance,
    template: &WeeklyTemplate,
    day_shift: i64,
    report: &mut RescheduleReport,
) -> Result<()> {
    let Some(signature) = original.signature() else {
        return Ok(());
    };

    let followers: Vec<ScheduledInstance> = instances
        .find_by_signature(&signature, original.date, None)
        .await?
        .into_iter()
        .filter(|i| i.id != original.id && !i.completed)
        .filter(|i| !holds_slot(template, dates::day_of_week(i.date), &signature))
        .collect();

    let outcomes: Vec<CascadeOutcome> = stream::iter(followers)
        .map(|follower| async move {
            let target = dates::shift_by_days(follower.date, day_shift);
            let patch = InstancePatch {
                require_incomplete: true,
                ..InstancePatch::move_to(target)
            };
            match instances.update(follower.id, &patch).await {
                Ok(Some(_)) => CascadeOutcome::Moved(follower.id),
                Ok(None) => CascadeOutcome::Skipped(follower.id),
                Err(err) => {
                    tracing::warn!(
                        instance_id = %follower.id,
                        %target,
                        error = %format!("{err:#}"),
                        "cascaded move failed"
                    );
                    CascadeOutcome::Failed(CascadeFailure {
                        instance_id: follower.id,
                        error: format!("{err:#}"),
                    })
                }
            }
        })
        .buffer_unordered(config.cascade_concurrency.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            CascadeOutcome::Moved(id) => report.cascaded.push(id),
            CascadeOutcome::Skipped(id) => report.skipped.push(id),
            CascadeOutcome::Failed(failure) => report.failed.push(failure),
        }
    }
    Ok(())
}

fn holds_slot(template: &WeeklyTemplate, day_of_week: u8, signature: &ExerciseSignature) -> bool {
    template.day(day_of_week).is_some_and(|day| {
        day.exercise_templates.iter().any(|et| {
            et.matches(
                &signature.exercise_id,
                signature.sets,
                signature.reps,
                signature.weight,
            )
        })
    })
}
