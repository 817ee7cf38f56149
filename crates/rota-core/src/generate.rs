//! Materialization of a plan's weekly template into dated instances.
//!
//! Generation is idempotent. An occurrence is skipped when a visible
//! instance with the same signature already exists on that date, or when a
//! hidden tombstone records that the occurrence was moved away. The
//! stores' unique indexes back this up for concurrent callers: an insert that
//! loses the race is suppressed and counted as skipped.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use rota_db::models::ScheduledInstance;
use rota_db::queries::instances::{InstanceFilter, NewInstance};
use rota_db::template::ExerciseTemplate;

use crate::dates;
use crate::error::{NotFoundKind, Result, ScheduleError};
use crate::store::{Catalog, InstanceRepository, PlanRepository};

/// Outcome of one [`ensure_generated`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: usize,
    pub skipped: usize,
}

/// `(exercise_id, sets, reps, weight bits, date)` of one slot occurrence.
type OccurrenceKey = (String, i32, i32, u64, NaiveDate);

/// What already exists for a plan within the requested range.
#[derive(Default)]
struct Existing {
    visible: HashSet<OccurrenceKey>,
    /// Occurrences that moved away, keyed by the slot they came from.
    tombstones: HashSet<OccurrenceKey>,
}

impl Existing {
    fn from_rows(rows: &[ScheduledInstance]) -> Self {
        let mut existing = Self::default();
        for row in rows {
            if row.is_hidden {
                if let Some(slot) = row.suppressed_signature() {
                    existing.tombstones.insert((
                        slot.exercise_id,
                        slot.sets,
                        slot.reps,
                        slot.weight.to_bits(),
                        row.date,
                    ));
                }
            } else {
                existing.visible.insert((
                    row.exercise_id.clone(),
                    row.sets,
                    row.reps,
                    row.weight.to_bits(),
                    row.date,
                ));
            }
        }
        existing
    }

    fn covers(&self, et: &ExerciseTemplate, date: NaiveDate) -> bool {
        let key = key(et, date);
        self.tombstones.contains(&key) || self.visible.contains(&key)
    }
}

fn key(et: &ExerciseTemplate, date: NaiveDate) -> OccurrenceKey {
    (
        et.exercise_id.clone(),
        et.sets,
        et.reps,
        et.weight.to_bits(),
        date,
    )
}

/// Reject empty or oversized ranges.
pub fn validate_range(from: NaiveDate, to: NaiveDate, max_days: u32) -> Result<()> {
    if from > to {
        return Err(ScheduleError::validation(format!(
            "range start {from} is after range end {to}"
        )));
    }
    let span = dates::span_days(from, to);
    if span > i64::from(max_days) {
        return Err(ScheduleError::validation(format!(
            "range {from}..{to} spans {span} days (limit {max_days})"
        )));
    }
    Ok(())
}

/// Ensure every template occurrence of `plan_id` within `[from, to]` is
/// materialized.
pub async fn ensure_generated(
    plans: &dyn PlanRepository,
    instances: &dyn InstanceRepository,
    catalog: &dyn Catalog,
    plan_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    max_days: u32,
) -> Result<GenerationReport> {
    validate_range(from, to, max_days)?;

    let plan = plans
        .get_by_id(plan_id)
        .await?
        .ok_or(ScheduleError::NotFound(NotFoundKind::Plan(plan_id)))?;
    let template = plan.template();

    let mut report = GenerationReport::default();
    if template.slot_count() == 0 {
        tracing::debug!(plan_id = %plan_id, "plan template is empty; nothing to generate");
        return Ok(report);
    }

    let rows = instances
        .find_by_date_range(from, to, &InstanceFilter::plan_with_hidden(plan_id))
        .await?;
    let mut existing = Existing::from_rows(&rows);
    let mut categories: HashMap<String, String> = HashMap::new();

    for date in dates::enumerate_dates(from, to) {
        let Some(day) = template.day(dates::day_of_week(date)) else {
            continue;
        };

        for et in day.ordered() {
            if existing.covers(et, date) {
                report.skipped += 1;
                continue;
            }

            let category_id = match categories.get(&et.exercise_id) {
                Some(category) => category.clone(),
                None => {
                    let exercise = catalog.get_exercise(&et.exercise_id).await?.ok_or_else(|| {
                        ScheduleError::NotFound(NotFoundKind::Exercise(et.exercise_id.clone()))
                    })?;
                    categories.insert(et.exercise_id.clone(), exercise.category_id.clone());
                    exercise.category_id
                }
            };

            let new = NewInstance {
                exercise_id: et.exercise_id.clone(),
                category_id,
                workout_plan_id: Some(plan_id),
                date,
                sets: et.sets,
                reps: et.reps,
                weight: et.weight,
                weight_plates: None,
                notes: et.notes.clone(),
                is_hidden: false,
                suppressed_sets: None,
                suppressed_reps: None,
                suppressed_weight: None,
            };

            match instances.create_if_absent(&new).await? {
                Some(_) => {
                    existing.visible.insert(key(et, date));
                    report.created += 1;
                }
                None => report.skipped += 1,
            }
        }
    }

    tracing::info!(
        plan_id = %plan_id,
        %from,
        %to,
        created = report.created,
        skipped = report.skipped,
        "ensured plan instances"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn validate_range_limits() {
        assert!(validate_range(d(2025, 1, 6), d(2025, 1, 6), 1).is_ok());
        assert!(validate_range(d(2025, 1, 6), d(2025, 1, 12), 7).is_ok());
        assert!(matches!(
            validate_range(d(2025, 1, 6), d(2025, 1, 13), 7),
            Err(ScheduleError::Validation(_))
        ));
        assert!(matches!(
            validate_range(d(2025, 1, 7), d(2025, 1, 6), 366),
            Err(ScheduleError::Validation(_))
        ));
    }

    #[test]
    fn tombstone_covers_only_its_own_slot() {
        let tombstone = ScheduledInstance {
            id: Uuid::new_v4(),
            exercise_id: "squat".to_string(),
            category_id: "legs".to_string(),
            workout_plan_id: Some(Uuid::new_v4()),
            date: d(2025, 1, 8),
            sets: 0,
            reps: 0,
            weight: 0.0,
            weight_plates: None,
            notes: None,
            completed: false,
            completed_at: None,
            is_hidden: true,
            suppressed_sets: Some(3),
            suppressed_reps: Some(10),
            suppressed_weight: Some(50.0),
            created_at: chrono::Utc::now(),
        };
        let existing = Existing::from_rows(&[tombstone]);
        let light = ExerciseTemplate {
            exercise_id: "squat".to_string(),
            sets: 3,
            reps: 10,
            weight: 50.0,
            duration: None,
            notes: None,
            order_index: 0,
        };
        let heavy = ExerciseTemplate {
            sets: 5,
            reps: 5,
            weight: 80.0,
            order_index: 1,
            ..light.clone()
        };
        assert!(existing.covers(&light, d(2025, 1, 8)));
        assert!(!existing.covers(&light, d(2025, 1, 15)));
        assert!(!existing.covers(&heavy, d(2025, 1, 8)));
    }
}
