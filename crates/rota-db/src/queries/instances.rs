//! Database query functions for the `scheduled_instances` table.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ExerciseSignature, ScheduledInstance};

/// Parameters for inserting a new instance row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInstance {
    pub exercise_id: String,
    pub category_id: String,
    pub workout_plan_id: Option<Uuid>,
    pub date: NaiveDate,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    pub weight_plates: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub is_hidden: bool,
    pub suppressed_sets: Option<i32>,
    pub suppressed_reps: Option<i32>,
    pub suppressed_weight: Option<f64>,
}

impl NewInstance {
    /// A zero-valued hidden row at `occurrence.date` recording that this
    /// template occurrence moved away.
    pub fn tombstone_for(occurrence: &ScheduledInstance) -> Self {
        Self {
            exercise_id: occurrence.exercise_id.clone(),
            category_id: occurrence.category_id.clone(),
            workout_plan_id: occurrence.workout_plan_id,
            date: occurrence.date,
            sets: 0,
            reps: 0,
            weight: 0.0,
            weight_plates: None,
            notes: None,
            is_hidden: true,
            suppressed_sets: Some(occurrence.sets),
            suppressed_reps: Some(occurrence.reps),
            suppressed_weight: Some(occurrence.weight),
        }
    }
}

/// A partial update. `None` fields are left unchanged; the doubly-optional
/// fields use `Some(None)` to clear a nullable column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancePatch {
    pub date: Option<NaiveDate>,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub notes: Option<Option<String>>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    /// Only apply the patch if the instance is not completed.
    pub require_incomplete: bool,
}

impl InstancePatch {
    /// A patch that only moves the instance to a new date.
    pub fn move_to(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }
}

/// Filters for range queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceFilter {
    pub workout_plan_id: Option<Uuid>,
    pub exercise_id: Option<String>,
    pub include_hidden: bool,
}

impl InstanceFilter {
    /// Everything materialized for one plan, tombstones included.
    pub fn plan_with_hidden(plan_id: Uuid) -> Self {
        Self {
            workout_plan_id: Some(plan_id),
            exercise_id: None,
            include_hidden: true,
        }
    }
}

/// Insert an instance. Unique-constraint violations are returned as errors
/// (see [`super::is_unique_violation`]).
pub async fn insert_instance(pool: &PgPool, new: &NewInstance) -> Result<ScheduledInstance> {
    let instance = sqlx::query_as::<_, ScheduledInstance>(
        "INSERT INTO scheduled_instances \
         (exercise_id, category_id, workout_plan_id, date, sets, reps, weight, \
          weight_plates, notes, is_hidden, \
          suppressed_sets, suppressed_reps, suppressed_weight) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING *",
    )
    .bind(&new.exercise_id)
    .bind(&new.category_id)
    .bind(new.workout_plan_id)
    .bind(new.date)
    .bind(new.sets)
    .bind(new.reps)
    .bind(new.weight)
    .bind(&new.weight_plates)
    .bind(&new.notes)
    .bind(new.is_hidden)
    .bind(new.suppressed_sets)
    .bind(new.suppressed_reps)
    .bind(new.suppressed_weight)
    .fetch_one(pool)
    .await
    .with_context(|| {
        format!(
            "failed to insert instance of {:?} on {}",
            new.exercise_id, new.date
        )
    })?;

    Ok(instance)
}

/// Insert an instance unless a conflicting row already exists.
///
/// Returns `None` when a unique index (visible signature or tombstone)
/// suppressed the insert. This is what makes generation safe to run
/// concurrently.
pub async fn insert_instance_if_absent(
    pool: &PgPool,
    new: &NewInstance,
) -> Result<Option<ScheduledInstance>> {
    let instance = sqlx::query_as::<_, ScheduledInstance>(
        "INSERT INTO scheduled_instances \
         (exercise_id, category_id, workout_plan_id, date, sets, reps, weight, \
          weight_plates, notes, is_hidden, \
          suppressed_sets, suppressed_reps, suppressed_weight) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT DO NOTHING \
         RETURNING *",
    )
    .bind(&new.exercise_id)
    .bind(&new.category_id)
    .bind(new.workout_plan_id)
    .bind(new.date)
    .bind(new.sets)
    .bind(new.reps)
    .bind(new.weight)
    .bind(&new.weight_plates)
    .bind(&new.notes)
    .bind(new.is_hidden)
    .bind(new.suppressed_sets)
    .bind(new.suppressed_reps)
    .bind(new.suppressed_weight)
    .fetch_optional(pool)
    .await
    .with_context(|| {
        format!(
            "failed to insert instance of {:?} on {}",
            new.exercise_id, new.date
        )
    })?;

    Ok(instance)
}

/// Fetch a single instance by ID.
pub async fn get_instance(pool: &PgPool, id: Uuid) -> Result<Option<ScheduledInstance>> {
    let instance =
        sqlx::query_as::<_, ScheduledInstance>("SELECT * FROM scheduled_instances WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch instance")?;

    Ok(instance)
}

/// Apply a partial update. Returns `None` if the instance does not exist, or
/// if `require_incomplete` is set and the instance is completed.
pub async fn update_instance(
    pool: &PgPool,
    id: Uuid,
    patch: &InstancePatch,
) -> Result<Option<ScheduledInstance>> {
    let instance = sqlx::query_as::<_, ScheduledInstance>(
        "UPDATE scheduled_instances \
         SET date = COALESCE($2, date), \
             sets = COALESCE($3, sets), \
             reps = COALESCE($4, reps), \
             weight = COALESCE($5, weight), \
             notes = CASE WHEN $6 THEN $7 ELSE notes END, \
             completed = COALESCE($8, completed), \
             completed_at = CASE WHEN $9 THEN $10 ELSE completed_at END \
         WHERE id = $1 AND (NOT $11 OR completed = false) \
         RETURNING *",
    )
    .bind(id)
    .bind(patch.date)
    .bind(patch.sets)
    .bind(patch.reps)
    .bind(patch.weight)
    .bind(patch.notes.is_some())
    .bind(patch.notes.clone().flatten())
    .bind(patch.completed)
    .bind(patch.completed_at.is_some())
    .bind(patch.completed_at.flatten())
    .bind(patch.require_incomplete)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update instance {id}"))?;

    Ok(instance)
}

/// Delete an instance. Returns whether a row was removed.
pub async fn delete_instance(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM scheduled_instances WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete instance {id}"))?;

    Ok(result.rows_affected() > 0)
}

/// List instances dated within `[start, end]`, ordered by date then creation
/// time.
pub async fn list_instances_in_range(
    pool: &PgPool,
    start: NaiveDate,
    end: NaiveDate,
    filter: &InstanceFilter,
) -> Result<Vec<ScheduledInstance>> {
    let instances = sqlx::query_as::<_, ScheduledInstance>(
        "SELECT * FROM scheduled_instances \
         WHERE date BETWEEN $1 AND $2 \
           AND ($3::uuid IS NULL OR workout_plan_id = $3) \
           AND ($4::text IS NULL OR exercise_id = $4) \
           AND ($5 OR is_hidden = false) \
         ORDER BY date ASC, created_at ASC",
    )
    .bind(start)
    .bind(end)
    .bind(filter.workout_plan_id)
    .bind(filter.exercise_id.as_deref())
    .bind(filter.include_hidden)
    .fetch_all(pool)
    .await
    .context("failed to list instances in range")?;

    Ok(instances)
}

/// Find visible instances of one recurring slot dated on or after `from`
/// (and on or before `to`, when given).
pub async fn find_by_signature(
    pool: &PgPool,
    signature: &ExerciseSignature,
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> Result<Vec<ScheduledInstance>> {
    let instances = sqlx::query_as::<_, ScheduledInstance>(
        "SELECT * FROM scheduled_instances \
         WHERE workout_plan_id = $1 \
           AND exercise_id = $2 \
           AND sets = $3 AND reps = $4 AND weight = $5 \
           AND is_hidden = false \
           AND date >= $6 \
           AND ($7::date IS NULL OR date <= $7) \
         ORDER BY date ASC",
    )
    .bind(signature.workout_plan_id)
    .bind(&signature.exercise_id)
    .bind(signature.sets)
    .bind(signature.reps)
    .bind(signature.weight)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to find instances by signature")?;

    Ok(instances)
}
