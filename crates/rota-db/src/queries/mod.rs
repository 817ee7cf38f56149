//! Query functions, one module per table.

pub mod exercises;
pub mod instances;
pub mod plans;

/// Whether an error returned by a query function was caused by a unique
/// constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
