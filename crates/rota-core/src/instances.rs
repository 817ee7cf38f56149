//! Direct instance management: ad hoc creation, lookup, listing, deletion.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use rota_db::models::ScheduledInstance;
use rota_db::queries::instances::{InstanceFilter, NewInstance};

use crate::error::{NotFoundKind, Result, ScheduleError};
use crate::generate::validate_range;
use crate::store::{Catalog, InstanceRepository};

/// A user-created instance that belongs to no plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAdHocInstance {
    pub exercise_id: String,
    pub date: NaiveDate,
    pub sets: i32,
    pub reps: i32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub weight_plates: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_ad_hoc(
    instances: &dyn InstanceRepository,
    catalog: &dyn Catalog,
    new: NewAdHocInstance,
) -> Result<ScheduledInstance> {
    if new.sets < 0 || new.reps < 0 {
        return Err(ScheduleError::validation(format!(
            "sets and reps must be non-negative (got {}x{})",
            new.sets, new.reps
        )));
    }
    if !new.weight.is_finite() || new.weight < 0.0 {
        return Err(ScheduleError::validation(format!(
            "weight must be a non-negative number (got {})",
            new.weight
        )));
    }

    let exercise = catalog
        .get_exercise(&new.exercise_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound(NotFoundKind::Exercise(new.exercise_id.clone())))?;

    let instance = instances
        .create(&NewInstance {
            exercise_id: exercise.id,
            category_id: exercise.category_id,
            workout_plan_id: None,
            date: new.date,
            sets: new.sets,
            reps: new.reps,
            weight: new.weight,
            weight_plates: new.weight_plates,
            notes: new.notes,
            is_hidden: false,
            suppressed_sets: None,
            suppressed_reps: None,
            suppressed_weight: None,
        })
        .await?;

    tracing::info!(
        instance_id = %instance.id,
        exercise_id = %instance.exercise_id,
        date = %instance.date,
        "ad hoc instance created"
    );
    Ok(instance)
}

pub async fn get_instance(
    instances: &dyn InstanceRepository,
    id: Uuid,
) -> Result<ScheduledInstance> {
    instances
        .get(id)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Instance(id)))
}

/// Instances within `[from, to]`. Tombstones are excluded unless the filter
/// asks for them.
pub async fn list_instances(
    instances: &dyn InstanceRepository,
    from: NaiveDate,
    to: NaiveDate,
    filter: &InstanceFilter,
    max_days: u32,
) -> Result<Vec<ScheduledInstance>> {
    validate_range(from, to, max_days)?;
    Ok(instances.find_by_date_range(from, to, filter).await?)
}

pub async fn delete_instance(instances: &dyn InstanceRepository, id: Uuid) -> Result<()> {
    if !instances.delete(id).await? {
        return Err(ScheduleError::NotFound(NotFoundKind::Instance(id)));
    }
    tracing::info!(instance_id = %id, "instance deleted");
    Ok(())
}
