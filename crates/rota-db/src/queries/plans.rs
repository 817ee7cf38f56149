//! Database query functions for the `workout_plans` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{ScheduledInstance, WorkoutPlan};
use crate::template::WeeklyTemplate;

/// Outcome of an atomic template rewrite plus primary-instance move.
#[derive(Debug, Clone)]
pub enum SlotMoveOutcome {
    /// Both writes were committed.
    Committed {
        plan: WorkoutPlan,
        instance: ScheduledInstance,
    },
    /// The plan's template version no longer matched; nothing was written.
    VersionConflict,
    /// The instance vanished or was completed concurrently; nothing was
    /// written.
    InstanceUnavailable,
}

/// Insert a new plan. Returns the row with server-generated defaults
/// (id, version 0, timestamps).
pub async fn insert_plan(
    pool: &PgPool,
    name: &str,
    week_starts_on: i16,
    template: &WeeklyTemplate,
) -> Result<WorkoutPlan> {
    let plan = sqlx::query_as::<_, WorkoutPlan>(
        "INSERT INTO workout_plans (name, week_starts_on, weekly_template) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(name)
    .bind(week_starts_on)
    .bind(Json(template))
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert plan {name:?}"))?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<WorkoutPlan>> {
    let plan = sqlx::query_as::<_, WorkoutPlan>("SELECT * FROM workout_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List all plans, newest first.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<WorkoutPlan>> {
    let plans =
        sqlx::query_as::<_, WorkoutPlan>("SELECT * FROM workout_plans ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .context("failed to list plans")?;

    Ok(plans)
}

/// Replace a plan's weekly template if its version still equals
/// `expected_version`, bumping the version.
///
/// Returns `None` when the version did not match or the plan does not exist.
pub async fn update_template(
    pool: &PgPool,
    id: Uuid,
    template: &WeeklyTemplate,
    expected_version: i64,
) -> Result<Option<WorkoutPlan>> {
    let plan = sqlx::query_as::<_, WorkoutPlan>(
        "UPDATE workout_plans \
         SET weekly_template = $1, \
             template_version = template_version + 1, \
             updated_at = now() \
         WHERE id = $2 AND template_version = $3 \
         RETURNING *",
    )
    .bind(Json(template))
    .bind(id)
    .bind(expected_version)
    .fetch_optional(pool)
    .await
    .context("failed to update weekly template")?;

    Ok(plan)
}

/// Rewrite a plan's template (version-checked) and move one uncompleted
/// instance to `new_date`, in a single transaction.
pub async fn commit_slot_move(
    pool: &PgPool,
    plan_id: Uuid,
    template: &WeeklyTemplate,
    expected_version: i64,
    instance_id: Uuid,
    new_date: NaiveDate,
) -> Result<SlotMoveOutcome> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = sqlx::query_as::<_, WorkoutPlan>(
        "UPDATE workout_plans \
         SET weekly_template = $1, \
             template_version = template_version + 1, \
             updated_at = now() \
         WHERE id = $2 AND template_version = $3 \
         RETURNING *",
    )
    .bind(Json(template))
    .bind(plan_id)
    .bind(expected_version)
    .fetch_optional(&mut *tx)
    .await
    .context("failed to update weekly template")?;

    let Some(plan) = plan else {
        // Dropping the transaction rolls it back.
        return Ok(SlotMoveOutcome::VersionConflict);
    };

    let instance = sqlx::query_as::<_, ScheduledInstance>(
        "UPDATE scheduled_instances \
         SET date = $1 \
         WHERE id = $2 AND completed = false AND is_hidden = false \
         RETURNING *",
    )
    .bind(new_date)
    .bind(instance_id)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("failed to move instance {instance_id}"))?;

    let Some(instance) = instance else {
        return Ok(SlotMoveOutcome::InstanceUnavailable);
    };

    tx.commit().await.context("failed to commit transaction")?;

    Ok(SlotMoveOutcome::Committed { plan, instance })
}
