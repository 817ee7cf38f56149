//! In-memory store for tests and embedders that do not need PostgreSQL.
//!
//! Mirrors the database's constraints under a single `RwLock`: the visible
//! signature and tombstone unique indexes, the exercise foreign key, and the
//! version-checked template writes.

use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use rota_db::models::{Exercise, ExerciseSignature, ScheduledInstance, WorkoutPlan};
use rota_db::queries::instances::{InstanceFilter, InstancePatch, NewInstance};
use rota_db::queries::plans::SlotMoveOutcome;
use rota_db::template::WeeklyTemplate;

use super::UniqueViolation;
use super::trait_def::{Catalog, InstanceRepository, PlanRepository};

#[derive(Debug, Default)]
struct State {
    exercises: HashMap<String, Exercise>,
    plans: HashMap<Uuid, WorkoutPlan>,
    /// Insertion order doubles as the creation-time tie breaker.
    instances: Vec<ScheduledInstance>,
}

impl State {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.instances.iter().position(|i| i.id == id)
    }

    /// Check `candidate` against every other row's unique keys.
    fn check_unique(&self, candidate: &ScheduledInstance) -> Result<()> {
        let Some(plan_id) = candidate.workout_plan_id else {
            return Ok(());
        };
        let clash = self.instances.iter().any(|other| {
            other.id != candidate.id
                && other.workout_plan_id == Some(plan_id)
                && other.is_hidden == candidate.is_hidden
                && other.exercise_id == candidate.exercise_id
                && other.date == candidate.date
                && if candidate.is_hidden {
                    other.suppressed_sets == candidate.suppressed_sets
                        && other.suppressed_reps == candidate.suppressed_reps
                        && other.suppressed_weight == candidate.suppressed_weight
                } else {
                    other.sets == candidate.sets
                        && other.reps == candidate.reps
                        && other.weight == candidate.weight
                }
        });
        if clash {
            let kind = if candidate.is_hidden {
                "tombstone"
            } else {
                "visible occurrence"
            };
            return Err(UniqueViolation(format!(
                "{kind} of {:?} on {} already exists for plan {plan_id}",
                candidate.exercise_id, candidate.date
            ))
            .into());
        }
        Ok(())
    }

    fn insert(&mut self, new: &NewInstance) -> Result<ScheduledInstance> {
        if !self.exercises.contains_key(&new.exercise_id) {
            bail!("unknown exercise {:?}", new.exercise_id);
        }
        if let Some(plan_id) = new.workout_plan_id {
            if !self.plans.contains_key(&plan_id) {
                bail!("unknown plan {plan_id}");
            }
        }
        if new.is_hidden
            && (new.workout_plan_id.is_none()
                || new.suppressed_sets.is_none()
                || new.suppressed_reps.is_none()
                || new.suppressed_weight.is_none())
        {
            bail!("tombstone of {:?} on {} must name its plan slot", new.exercise_id, new.date);
        }
        let instance = ScheduledInstance {
            id: Uuid::new_v4(),
            exercise_id: new.exercise_id.clone(),
            category_id: new.category_id.clone(),
            workout_plan_id: new.workout_plan_id,
            date: new.date,
            sets: new.sets,
            reps: new.reps,
            weight: new.weight,
            weight_plates: new.weight_plates.clone(),
            notes: new.notes.clone(),
            completed: false,
            completed_at: None,
            is_hidden: new.is_hidden,
            suppressed_sets: new.suppressed_sets,
            suppressed_reps: new.suppressed_reps,
            suppressed_weight: new.suppressed_weight,
            created_at: Utc::now(),
        };
        self.check_unique(&instance)?;
        self.instances.push(instance.clone());
        Ok(instance)
    }

    fn apply(&mut self, id: Uuid, patch: &InstancePatch) -> Result<Option<ScheduledInstance>> {
        let Some(pos) = self.position(id) else {
            return Ok(None);
        };
        let current = &self.instances[pos];
        if patch.require_incomplete && current.completed {
            return Ok(None);
        }

        let mut next = current.clone();
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(sets) = patch.sets {
            next.sets = sets;
        }
        if let Some(reps) = patch.reps {
            next.reps = reps;
        }
        if let Some(weight) = patch.weight {
            next.weight = weight;
        }
        if let Some(notes) = &patch.notes {
            next.notes = notes.clone();
        }
        if let Some(completed) = patch.completed {
            next.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            next.completed_at = completed_at;
        }

        self.check_unique(&next)?;
        self.instances[pos] = next.clone();
        Ok(Some(next))
    }

    fn swap_template(
        &mut self,
        id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
    ) -> Option<WorkoutPlan> {
        let plan = self.plans.get_mut(&id)?;
        if plan.template_version != expected_version {
            return None;
        }
        plan.weekly_template = Json(template.clone());
        plan.template_version += 1;
        plan.updated_at = Utc::now();
        Some(plan.clone())
    }
}

/// Implements every storage trait over process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog entry, replacing any existing one with the same id.
    pub async fn add_exercise(&self, id: &str, name: &str, category_id: &str) -> Exercise {
        let exercise = Exercise {
            id: id.to_owned(),
            name: name.to_owned(),
            category_id: category_id.to_owned(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .exercises
            .insert(exercise.id.clone(), exercise.clone());
        exercise
    }

    /// Every stored instance, tombstones included, in creation order.
    pub async fn snapshot(&self) -> Vec<ScheduledInstance> {
        self.state.read().await.instances.clone()
    }
}

#[async_trait]
impl InstanceRepository for MemoryStore {
    async fn create(&self, new: &NewInstance) -> Result<ScheduledInstance> {
        self.state.write().await.insert(new)
    }

    async fn create_if_absent(&self, new: &NewInstance) -> Result<Option<ScheduledInstance>> {
        match self.state.write().await.insert(new) {
            Ok(instance) => Ok(Some(instance)),
            Err(err) if err.is::<UniqueViolation>() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledInstance>> {
        let state = self.state.read().await;
        Ok(state.position(id).map(|pos| state.instances[pos].clone()))
    }

    async fn update(&self, id: Uuid, patch: &InstancePatch) -> Result<Option<ScheduledInstance>> {
        self.state.write().await.apply(id, patch)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.position(id) {
            Some(pos) => {
                state.instances.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &InstanceFilter,
    ) -> Result<Vec<ScheduledInstance>> {
        let state = self.state.read().await;
        let mut out: Vec<ScheduledInstance> = state
            .instances
            .iter()
            .filter(|i| i.date >= start && i.date <= end)
            .filter(|i| filter.include_hidden || !i.is_hidden)
            .filter(|i| {
                filter
                    .workout_plan_id
                    .is_none_or(|plan_id| i.workout_plan_id == Some(plan_id))
            })
            .filter(|i| {
                filter
                    .exercise_id
                    .as_deref()
                    .is_none_or(|exercise_id| i.exercise_id == exercise_id)
            })
            .cloned()
            .collect();
        out.sort_by_key(|i| i.date);
        Ok(out)
    }

    async fn find_by_signature(
        &self,
        signature: &ExerciseSignature,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ScheduledInstance>> {
        let state = self.state.read().await;
        let mut out: Vec<ScheduledInstance> = state
            .instances
            .iter()
            .filter(|i| signature.matches(i))
            .filter(|i| i.date >= from && to.is_none_or(|to| i.date <= to))
            .cloned()
            .collect();
        out.sort_by_key(|i| i.date);
        Ok(out)
    }
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn create_plan(
        &self,
        name: &str,
        week_starts_on: u8,
        template: &WeeklyTemplate,
    ) -> Result<WorkoutPlan> {
        if week_starts_on > 6 {
            bail!("week_starts_on {week_starts_on} is out of range");
        }
        let now = Utc::now();
        let plan = WorkoutPlan {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            week_starts_on: i16::from(week_starts_on),
            weekly_template: Json(template.clone()),
            template_version: 0,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<WorkoutPlan>> {
        Ok(self.state.read().await.plans.get(&id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<WorkoutPlan>> {
        let mut plans: Vec<WorkoutPlan> = self.state.read().await.plans.values().cloned().collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    async fn update_template(
        &self,
        id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
    ) -> Result<Option<WorkoutPlan>> {
        Ok(self
            .state
            .write()
            .await
            .swap_template(id, template, expected_version))
    }

    async fn commit_slot_move(
        &self,
        plan_id: Uuid,
        template: &WeeklyTemplate,
        expected_version: i64,
        instance_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<SlotMoveOutcome> {
        let mut state = self.state.write().await;

        let version_ok = state
            .plans
            .get(&plan_id)
            .is_some_and(|p| p.template_version == expected_version);
        if !version_ok {
            return Ok(SlotMoveOutcome::VersionConflict);
        }

        let movable = state
            .position(instance_id)
            .map(|pos| &state.instances[pos])
            .is_some_and(|i| !i.completed && !i.is_hidden);
        if !movable {
            return Ok(SlotMoveOutcome::InstanceUnavailable);
        }

        // The instance write is the only one that can fail, so it goes first
        // and the template swap cannot be left half-applied.
        let Some(instance) = state.apply(instance_id, &InstancePatch::move_to(new_date))? else {
            return Ok(SlotMoveOutcome::InstanceUnavailable);
        };
        let Some(plan) = state.swap_template(plan_id, template, expected_version) else {
            return Ok(SlotMoveOutcome::VersionConflict);
        };

        Ok(SlotMoveOutcome::Committed { plan, instance })
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>> {
        Ok(self.state.read().await.exercises.get(exercise_id).cloned())
    }
}
