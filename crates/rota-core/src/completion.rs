//! Completion tracking.
//!
//! Both transitions are idempotent: completing an already-completed instance
//! refreshes nothing and returns it unchanged.

use uuid::Uuid;

use rota_db::models::ScheduledInstance;
use rota_db::queries::instances::InstancePatch;

use crate::error::{NotFoundKind, Result, ScheduleError};
use crate::store::{Clock, InstanceRepository};

async fn load(instances: &dyn InstanceRepository, id: Uuid) -> Result<ScheduledInstance> {
    let instance = instances
        .get(id)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Instance(id)))?;
    if instance.is_hidden {
        return Err(ScheduleError::validation(format!(
            "instance {id} is a hidden tombstone and cannot change completion state"
        )));
    }
    Ok(instance)
}

/// Mark an instance completed at `clock.now()`.
pub async fn mark_completed(
    instances: &dyn InstanceRepository,
    clock: &dyn Clock,
    id: Uuid,
) -> Result<ScheduledInstance> {
    let instance = load(instances, id).await?;
    if instance.completed {
        return Ok(instance);
    }

    let patch = InstancePatch {
        completed: Some(true),
        completed_at: Some(Some(clock.now())),
        ..InstancePatch::default()
    };
    let updated = instances
        .update(id, &patch)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Instance(id)))?;

    tracing::info!(instance_id = %id, date = %updated.date, "instance completed");
    Ok(updated)
}

/// Clear an instance's completion.
pub async fn mark_incomplete(
    instances: &dyn InstanceRepository,
    id: Uuid,
) -> Result<ScheduledInstance> {
    let instance = load(instances, id).await?;
    if !instance.completed && instance.completed_at.is_none() {
        return Ok(instance);
    }

    let patch = InstancePatch {
        completed: Some(false),
        completed_at: Some(None),
        ..InstancePatch::default()
    };
    let updated = instances
        .update(id, &patch)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Instance(id)))?;

    tracing::info!(instance_id = %id, date = %updated.date, "instance reopened");
    Ok(updated)
}
