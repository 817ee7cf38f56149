//! TOML plan files.
//!
//! A plan file describes a plan's name, week start and weekly template:
//!
//! ```toml
//! [plan]
//! name = "Strength"
//! week_starts_on = 1
//!
//! [[days]]
//! day_of_week = 1
//! name = "Legs"
//!
//! [[days.exercises]]
//! exercise_id = "squat"
//! sets = 3
//! reps = 10
//! weight = 50.0
//! ```
//!
//! Parsing validates structure only; [`create_plan_from_file`] additionally
//! checks every exercise against the catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rota_db::models::WorkoutPlan;
use rota_db::template::{
    DayTemplate, ExerciseTemplate, TemplateError, WeeklyTemplate, weekday_name,
};

use crate::error::{Result, ScheduleError};
use crate::store::{Catalog, PlanRepository};

/// Errors that can occur while parsing and validating a plan file.
#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("plan name must not be empty")]
    EmptyName,

    #[error("week_starts_on {0} is out of range (expected 0-6)")]
    InvalidWeekStart(u8),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{field} of {exercise_id:?} on day {day_of_week} must be non-negative")]
    NegativeValue {
        day_of_week: u8,
        exercise_id: String,
        field: &'static str,
    },

    #[error("unknown exercise(s) not in catalog: {}", .0.join(", "))]
    UnknownExercises(Vec<String>),
}

impl From<PlanFileError> for ScheduleError {
    fn from(err: PlanFileError) -> Self {
        ScheduleError::Validation(err.to_string())
    }
}

/// Top-level structure of a plan file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    pub plan: PlanMeta,
    #[serde(default)]
    pub days: Vec<DayToml>,
}

/// `[plan]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub name: String,
    #[serde(default = "default_week_starts_on")]
    pub week_starts_on: u8,
}

fn default_week_starts_on() -> u8 {
    1
}

/// A `[[days]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayToml {
    pub day_of_week: u8,
    /// Defaults to the weekday name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseToml>,
}

/// A `[[days.exercises]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseToml {
    pub exercise_id: String,
    pub sets: i32,
    pub reps: i32,
    #[serde(default)]
    pub weight: f64,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Defaults to the entry's position within the day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

/// Parse and validate a plan file.
pub fn parse_plan_file(content: &str) -> std::result::Result<PlanFile, PlanFileError> {
    let file: PlanFile = toml::from_str(content)?;
    validate(&file)?;
    Ok(file)
}

fn validate(file: &PlanFile) -> std::result::Result<(), PlanFileError> {
    if file.plan.name.trim().is_empty() {
        return Err(PlanFileError::EmptyName);
    }
    if file.plan.week_starts_on > 6 {
        return Err(PlanFileError::InvalidWeekStart(file.plan.week_starts_on));
    }

    for day in &file.days {
        for ex in &day.exercises {
            let negative = if ex.sets < 0 {
                Some("sets")
            } else if ex.reps < 0 {
                Some("reps")
            } else if !(ex.weight >= 0.0 && ex.weight.is_finite()) {
                Some("weight")
            } else if ex.duration.is_some_and(|d| d < 0) {
                Some("duration")
            } else {
                None
            };
            if let Some(field) = negative {
                return Err(PlanFileError::NegativeValue {
                    day_of_week: day.day_of_week,
                    exercise_id: ex.exercise_id.clone(),
                    field,
                });
            }
        }
    }

    file.to_template().validate()?;
    Ok(())
}

impl PlanFile {
    /// The weekly template described by this file, days sorted by weekday.
    pub fn to_template(&self) -> WeeklyTemplate {
        let mut days: Vec<DayTemplate> = self
            .days
            .iter()
            .map(|day| DayTemplate {
                day_of_week: day.day_of_week,
                name: day
                    .name
                    .clone()
                    .unwrap_or_else(|| weekday_name(day.day_of_week).to_owned()),
                exercise_templates: day
                    .exercises
                    .iter()
                    .enumerate()
                    .map(|(position, ex)| ExerciseTemplate {
                        exercise_id: ex.exercise_id.clone(),
                        sets: ex.sets,
                        reps: ex.reps,
                        weight: ex.weight,
                        duration: ex.duration,
                        notes: ex.notes.clone(),
                        order_index: ex.order_index.unwrap_or(position as i32),
                    })
                    .collect(),
            })
            .collect();
        days.sort_by_key(|d| d.day_of_week);
        WeeklyTemplate { days }
    }

    /// Describe an existing plan in file form.
    pub fn from_plan(plan: &WorkoutPlan) -> Self {
        Self {
            plan: PlanMeta {
                name: plan.name.clone(),
                week_starts_on: plan.week_start(),
            },
            days: plan
                .template()
                .days
                .iter()
                .map(|day| DayToml {
                    day_of_week: day.day_of_week,
                    name: Some(day.name.clone()),
                    exercises: day
                        .ordered()
                        .into_iter()
                        .map(|et| ExerciseToml {
                            exercise_id: et.exercise_id.clone(),
                            sets: et.sets,
                            reps: et.reps,
                            weight: et.weight,
                            duration: et.duration,
                            notes: et.notes.clone(),
                            order_index: Some(et.order_index),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Store a validated plan file as a new plan. Every referenced exercise must
/// exist in the catalog.
pub async fn create_plan_from_file(
    plans: &dyn PlanRepository,
    catalog: &dyn Catalog,
    file: &PlanFile,
) -> Result<WorkoutPlan> {
    validate(file)?;
    let template = file.to_template();

    let mut missing = Vec::new();
    for exercise_id in template.exercise_ids() {
        if catalog.get_exercise(exercise_id).await?.is_none() {
            missing.push(exercise_id.to_owned());
        }
    }
    if !missing.is_empty() {
        return Err(PlanFileError::UnknownExercises(missing).into());
    }

    let plan = plans
        .create_plan(&file.plan.name, file.plan.week_starts_on, &template)
        .await?;

    tracing::info!(
        plan_id = %plan.id,
        name = %plan.name,
        days = template.days.len(),
        slots = template.slot_count(),
        "plan created"
    );
    Ok(plan)
}
