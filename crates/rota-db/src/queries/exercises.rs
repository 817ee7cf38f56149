//! Database query functions for the `exercises` catalog table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Exercise;

/// Insert a catalog entry. Fails if the id already exists.
pub async fn insert_exercise(
    pool: &PgPool,
    id: &str,
    name: &str,
    category_id: &str,
) -> Result<Exercise> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "INSERT INTO exercises (id, name, category_id) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert exercise {id:?}"))?;

    Ok(exercise)
}

/// Fetch a catalog entry by id.
pub async fn get_exercise(pool: &PgPool, id: &str) -> Result<Option<Exercise>> {
    let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch exercise {id:?}"))?;

    Ok(exercise)
}

/// List the catalog, ordered by category then name.
pub async fn list_exercises(pool: &PgPool) -> Result<Vec<Exercise>> {
    let exercises =
        sqlx::query_as::<_, Exercise>("SELECT * FROM exercises ORDER BY category_id, name")
            .fetch_all(pool)
            .await
            .context("failed to list exercises")?;

    Ok(exercises)
}

/// Return the subset of `ids` that are not in the catalog, preserving input
/// order.
pub async fn missing_exercise_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<String>> {
    let found: Vec<(String,)> = sqlx::query_as("SELECT id FROM exercises WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .context("failed to look up exercise ids")?;

    let found: std::collections::HashSet<String> = found.into_iter().map(|(id,)| id).collect();
    Ok(ids.iter().filter(|id| !found.contains(*id)).cloned().collect())
}
