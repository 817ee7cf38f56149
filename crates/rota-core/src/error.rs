//! Error taxonomy for scheduling operations.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// What could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    Instance(Uuid),
    Plan(Uuid),
    Exercise(String),
    /// The plan has no day template for the given day of week.
    TemplateNotFound { plan_id: Uuid, day_of_week: u8 },
    /// The day template holds no exercise matching the instance's signature.
    ExerciseTemplateNotFound { plan_id: Uuid, exercise_id: String },
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "instance {id} not found"),
            Self::Plan(id) => write!(f, "plan {id} not found"),
            Self::Exercise(id) => write!(f, "exercise {id:?} not found in catalog"),
            Self::TemplateNotFound {
                plan_id,
                day_of_week,
            } => write!(
                f,
                "plan {plan_id} has no template for day_of_week {day_of_week}"
            ),
            Self::ExerciseTemplateNotFound {
                plan_id,
                exercise_id,
            } => write!(
                f,
                "plan {plan_id} has no exercise template matching {exercise_id:?}"
            ),
        }
    }
}

/// Errors returned by the scheduler.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The request was rejected before anything was mutated.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(NotFoundKind),

    /// A concurrent writer won (template version mismatch after retries, or
    /// a unique-constraint collision).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The primary move committed but some cascaded moves failed.
    #[error("moved {moved} instance(s), {} cascade update(s) failed", failed.len())]
    PartialCascade {
        moved: usize,
        failed: Vec<(Uuid, String)>,
    },

    #[error("repository error: {0:#}")]
    Repository(#[from] anyhow::Error),
}

impl ScheduleError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result alias used throughout the engine.
pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let id = Uuid::nil();
        assert_eq!(
            ScheduleError::NotFound(NotFoundKind::Instance(id)).to_string(),
            format!("instance {id} not found")
        );
        assert_eq!(
            ScheduleError::validation("same date").to_string(),
            "invalid request: same date"
        );
        let partial = ScheduleError::PartialCascade {
            moved: 3,
            failed: vec![(id, "boom".to_string())],
        };
        assert_eq!(partial.to_string(), "moved 3 instance(s), 1 cascade update(s) failed");
    }

    #[test]
    fn anyhow_errors_convert_to_repository() {
        let err: ScheduleError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, ScheduleError::Repository(_)));
    }
}
