//! Operator-mode CLI handlers for `rota exercise` subcommands.
//!
//! Implements:
//! - `rota exercise add <id> --name <name> --category <category>`
//! - `rota exercise list`

use anyhow::Result;
use sqlx::PgPool;

use rota_db::queries::exercises as exercise_queries;

use crate::ExerciseCommands;

/// Dispatch an `ExerciseCommands` variant to the appropriate handler.
pub async fn run_exercise_command(command: ExerciseCommands, pool: &PgPool) -> Result<()> {
    match command {
        ExerciseCommands::Add { id, name, category } => {
            cmd_add(pool, &id, &name, &category).await
        }
        ExerciseCommands::List => cmd_list(pool).await,
    }
}

async fn cmd_add(pool: &PgPool, id: &str, name: &str, category: &str) -> Result<()> {
    let exercise = exercise_queries::insert_exercise(pool, id, name, category).await?;
    println!(
        "Added exercise {} ({}, category {}).",
        exercise.id, exercise.name, exercise.category_id
    );
    Ok(())
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let exercises = exercise_queries::list_exercises(pool).await?;

    if exercises.is_empty() {
        println!("No exercises found. Use `rota exercise add` to create one.");
        return Ok(());
    }

    let id_w = exercises.iter().map(|e| e.id.len()).max().unwrap_or(2).max(2);
    let name_w = exercises.iter().map(|e| e.name.len()).max().unwrap_or(4).max(4);

    println!("{:<id_w$}  {:<name_w$}  CATEGORY", "ID", "NAME");
    for exercise in &exercises {
        println!(
            "{:<id_w$}  {:<name_w$}  {}",
            exercise.id, exercise.name, exercise.category_id,
        );
    }

    Ok(())
}
