//! Storage seams used by the engine, plus the two shipped backends.
//!
//! The engine only talks to storage through the traits in [`trait_def`];
//! [`PgStore`] and [`MemoryStore`] each implement all of them.

pub mod memory;
pub mod postgres;
pub mod trait_def;

use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rota_db::models::{Exercise, ExerciseSignature, ScheduledInstance, WorkoutPlan};
pub use rota_db::queries::instances::{InstanceFilter, InstancePatch, NewInstance};
pub use rota_db::queries::plans::SlotMoveOutcome;
pub use trait_def::{Catalog, Clock, FixedClock, InstanceRepository, PlanRepository, SystemClock};

/// Raised by stores without a native unique index when a write would
/// duplicate a visible occurrence or a tombstone.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unique constraint violated: {0}")]
pub struct UniqueViolation(pub String);

/// Whether a store error was caused by a unique-constraint collision, in
/// either backend.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<UniqueViolation>().is_some() || rota_db::queries::is_unique_violation(err)
}
