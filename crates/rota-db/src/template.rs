//! The weekly template document stored in `workout_plans.weekly_template`.
//!
//! A plan's recurring pattern is a small, self-contained document: one
//! [`DayTemplate`] per day of week, each holding an ordered list of
//! [`ExerciseTemplate`]s. It is always read and written as a whole.
//!
//! Days are numbered 0 (Sunday) through 6 (Saturday).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names used for days created implicitly (e.g. by a whole-plan move).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Return the English weekday name for a day-of-week number.
pub fn weekday_name(day_of_week: u8) -> &'static str {
    WEEKDAY_NAMES
        .get(usize::from(day_of_week))
        .copied()
        .unwrap_or("Unknown")
}

/// Structural problems in a [`WeeklyTemplate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("day_of_week {0} is out of range (expected 0-6)")]
    InvalidDay(u8),

    #[error("day_of_week {0} appears more than once")]
    DuplicateDay(u8),

    #[error("order_index {order_index} appears more than once on day {day_of_week}")]
    DuplicateOrderIndex { day_of_week: u8, order_index: i32 },
}

/// The recurring weekly pattern of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    #[serde(default)]
    pub days: Vec<DayTemplate>,
}

/// The exercises scheduled on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub day_of_week: u8,
    pub name: String,
    #[serde(default)]
    pub exercise_templates: Vec<ExerciseTemplate>,
}

/// One recurring exercise slot within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub exercise_id: String,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    /// Target duration in seconds, for timed exercises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub order_index: i32,
}

impl ExerciseTemplate {
    /// Whether this slot has the given exercise signature.
    pub fn matches(&self, exercise_id: &str, sets: i32, reps: i32, weight: f64) -> bool {
        self.exercise_id == exercise_id
            && self.sets == sets
            && self.reps == reps
            && self.weight == weight
    }
}

impl DayTemplate {
    /// Create an empty day named after its weekday.
    pub fn empty(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            name: weekday_name(day_of_week).to_owned(),
            exercise_templates: Vec::new(),
        }
    }

    /// Exercises in generation/display order.
    pub fn ordered(&self) -> Vec<&ExerciseTemplate> {
        let mut out: Vec<&ExerciseTemplate> = self.exercise_templates.iter().collect();
        out.sort_by_key(|et| et.order_index);
        out
    }

    /// The order index an appended exercise receives: one past the current
    /// maximum, treating an empty day as having maximum 0.
    pub fn next_order_index(&self) -> i32 {
        self.exercise_templates
            .iter()
            .map(|et| et.order_index)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Remove and return the first exercise matching the signature.
    pub fn take_matching(
        &mut self,
        exercise_id: &str,
        sets: i32,
        reps: i32,
        weight: f64,
    ) -> Option<ExerciseTemplate> {
        let pos = self
            .exercise_templates
            .iter()
            .position(|et| et.matches(exercise_id, sets, reps, weight))?;
        Some(self.exercise_templates.remove(pos))
    }

    /// Append an exercise at the end of this day, reassigning its order index.
    pub fn append(&mut self, mut exercise: ExerciseTemplate) -> &ExerciseTemplate {
        exercise.order_index = self.next_order_index();
        self.exercise_templates.push(exercise);
        &self.exercise_templates[self.exercise_templates.len() - 1]
    }
}

impl WeeklyTemplate {
    /// The template for a given day of week, if the plan trains that day.
    pub fn day(&self, day_of_week: u8) -> Option<&DayTemplate> {
        self.days.iter().find(|d| d.day_of_week == day_of_week)
    }

    /// Mutable access to a day's template.
    pub fn day_mut(&mut self, day_of_week: u8) -> Option<&mut DayTemplate> {
        self.days.iter_mut().find(|d| d.day_of_week == day_of_week)
    }

    /// Return the day's template, creating an empty one if absent. Days stay
    /// sorted by day of week.
    pub fn day_or_insert(&mut self, day_of_week: u8) -> &mut DayTemplate {
        let pos = match self.days.iter().position(|d| d.day_of_week == day_of_week) {
            Some(pos) => pos,
            None => {
                let pos = self
                    .days
                    .iter()
                    .position(|d| d.day_of_week > day_of_week)
                    .unwrap_or(self.days.len());
                self.days.insert(pos, DayTemplate::empty(day_of_week));
                pos
            }
        };
        &mut self.days[pos]
    }

    /// Number of exercise slots across all days matching a signature.
    pub fn count_matching(&self, exercise_id: &str, sets: i32, reps: i32, weight: f64) -> usize {
        self.days
            .iter()
            .flat_map(|d| d.exercise_templates.iter())
            .filter(|et| et.matches(exercise_id, sets, reps, weight))
            .count()
    }

    /// Total number of exercise slots in the week.
    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|d| d.exercise_templates.len()).sum()
    }

    /// Every exercise id referenced by the template, deduplicated, in
    /// first-seen order.
    pub fn exercise_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.days
            .iter()
            .flat_map(|d| d.exercise_templates.iter())
            .map(|et| et.exercise_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Check the structural invariants: valid, unique days and unique order
    /// indexes within each day.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut days = HashSet::new();
        for day in &self.days {
            if day.day_of_week > 6 {
                return Err(TemplateError::InvalidDay(day.day_of_week));
            }
            if !days.insert(day.day_of_week) {
                return Err(TemplateError::DuplicateDay(day.day_of_week));
            }
            let mut indexes = HashSet::new();
            for et in &day.exercise_templates {
                if !indexes.insert(et.order_index) {
                    return Err(TemplateError::DuplicateOrderIndex {
                        day_of_week: day.day_of_week,
                        order_index: et.order_index,
                    });
                }
            }
        }
        Ok(())
    }
}
