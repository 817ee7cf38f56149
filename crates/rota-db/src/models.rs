use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::template::WeeklyTemplate;

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A catalog entry. The scheduler only needs the category to stamp onto
/// instances; everything else about an exercise lives outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
}

/// A workout plan and its recurring weekly template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub name: String,
    /// First day of the plan's calendar week (0 = Sunday).
    pub week_starts_on: i16,
    pub weekly_template: Json<WeeklyTemplate>,
    /// Bumped on every template write; used for compare-and-swap.
    pub template_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutPlan {
    pub fn template(&self) -> &WeeklyTemplate {
        &self.weekly_template.0
    }

    /// The configured week start as a day-of-week number, clamped to 0-6.
    pub fn week_start(&self) -> u8 {
        self.week_starts_on.clamp(0, 6) as u8
    }
}

/// A dated, trackable exercise occurrence.
///
/// Instances with a `workout_plan_id` were materialized from that plan's
/// template; instances without one were added ad hoc. Hidden instances are
/// tombstones marking a template slot that was moved away from `date`; their
/// own sets, reps and weight are zero and the `suppressed_*` columns name the
/// slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScheduledInstance {
    pub id: Uuid,
    pub exercise_id: String,
    pub category_id: String,
    pub workout_plan_id: Option<Uuid>,
    pub date: NaiveDate,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    pub weight_plates: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed_sets: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed_reps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed_weight: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledInstance {
    /// The recurring slot this instance belongs to, or `None` for ad hoc
    /// instances.
    pub fn signature(&self) -> Option<ExerciseSignature> {
        self.workout_plan_id.map(|plan_id| ExerciseSignature {
            workout_plan_id: plan_id,
            exercise_id: self.exercise_id.clone(),
            sets: self.sets,
            reps: self.reps,
            weight: self.weight,
        })
    }

    /// For a tombstone, the slot whose occurrence moved away from `date`.
    pub fn suppressed_signature(&self) -> Option<ExerciseSignature> {
        if !self.is_hidden {
            return None;
        }
        Some(ExerciseSignature {
            workout_plan_id: self.workout_plan_id?,
            exercise_id: self.exercise_id.clone(),
            sets: self.suppressed_sets?,
            reps: self.suppressed_reps?,
            weight: self.suppressed_weight?,
        })
    }
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// The tuple identifying "the same recurring slot" across dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSignature {
    pub workout_plan_id: Uuid,
    pub exercise_id: String,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
}

impl ExerciseSignature {
    /// Whether a visible instance belongs to this slot (date ignored).
    pub fn matches(&self, instance: &ScheduledInstance) -> bool {
        !instance.is_hidden
            && instance.workout_plan_id == Some(self.workout_plan_id)
            && instance.exercise_id == self.exercise_id
            && instance.sets == self.sets
            && instance.reps == self.reps
            && instance.weight == self.weight
    }
}
