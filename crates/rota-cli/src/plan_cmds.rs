//! Operator-mode CLI handlers for `rota plan` subcommands.
//!
//! Implements:
//! - `rota plan create <file>`          -- create a plan from a TOML file
//! - `rota plan show [plan-id] [--toml]` -- show plan details or list all plans

use anyhow::{Context, Result};
use uuid::Uuid;

use rota_core::Scheduler;
use rota_core::plan_file::{PlanFile, parse_plan_file};
use rota_db::template::weekday_name;

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, scheduler: &Scheduler) -> Result<()> {
    match command {
        PlanCommands::Create { file } => cmd_create(scheduler, &file).await,
        PlanCommands::Show { plan_id, toml } => match plan_id {
            Some(id) if toml => cmd_show_toml(scheduler, id).await,
            Some(id) => cmd_show_one(scheduler, id).await,
            None => cmd_show_all(scheduler).await,
        },
    }
}

// -----------------------------------------------------------------------
// rota plan create <file>
// -----------------------------------------------------------------------

/// Read a plan file from disk, validate it against the catalog, insert it,
/// and print a summary.
async fn cmd_create(scheduler: &Scheduler, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {}", file_path))?;

    let plan_file = parse_plan_file(&content)
        .with_context(|| format!("failed to parse plan file: {}", file_path))?;

    let plan = scheduler.create_plan(&plan_file).await?;
    let template = plan.template();

    println!("Plan created successfully.");
    println!();
    println!("  Plan ID:    {}", plan.id);
    println!("  Name:       {}", plan.name);
    println!("  Week start: {}", weekday_name(plan.week_start()));
    println!("  Days:       {}", template.days.len());
    println!("  Slots:      {}", template.slot_count());
    println!();
    println!("Next: `rota generate {}` to schedule the coming weeks.", plan.id);

    Ok(())
}

// -----------------------------------------------------------------------
// rota plan show (all)
// -----------------------------------------------------------------------

async fn cmd_show_all(scheduler: &Scheduler) -> Result<()> {
    let plans = scheduler.list_plans().await?;

    if plans.is_empty() {
        println!("No plans found. Use `rota plan create <file>` to create one.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = plans.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    let slots_w = 5;
    let version_w = 7;

    println!(
        "{:<id_w$}  {:<name_w$}  {:>slots_w$}  {:>version_w$}  CREATED",
        "ID", "NAME", "SLOTS", "VERSION",
    );

    for plan in &plans {
        let created = plan.created_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<id_w$}  {:<name_w$}  {:>slots_w$}  {:>version_w$}  {}",
            plan.id,
            plan.name,
            plan.template().slot_count(),
            plan.template_version,
            created,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// rota plan show <plan-id>
// -----------------------------------------------------------------------

/// Show the weekly template of a single plan, day by day.
async fn cmd_show_one(scheduler: &Scheduler, plan_id: Uuid) -> Result<()> {
    let plan = scheduler.get_plan(plan_id).await?;

    println!("Plan: {}", plan.name);
    println!("  ID:         {}", plan.id);
    println!("  Week start: {}", weekday_name(plan.week_start()));
    println!("  Version:    {}", plan.template_version);
    println!("  Updated:    {}", plan.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    let mut days: Vec<_> = plan.template().days.iter().collect();
    days.sort_by_key(|d| d.day_of_week);

    if days.is_empty() {
        println!("  (no training days)");
        return Ok(());
    }

    for day in days {
        println!("  {} -- {}", weekday_name(day.day_of_week), day.name);
        for slot in day.ordered() {
            let mut line = format!(
                "    {:>2}. {} {}x{} @ {}",
                slot.order_index, slot.exercise_id, slot.sets, slot.reps, slot.weight
            );
            if let Some(secs) = slot.duration {
                line.push_str(&format!(" ({secs}s)"));
            }
            if let Some(ref notes) = slot.notes {
                line.push_str(&format!("  # {notes}"));
            }
            println!("{line}");
        }
    }

    Ok(())
}

/// Print the plan in plan-file form, suitable for `rota plan create`.
async fn cmd_show_toml(scheduler: &Scheduler, plan_id: Uuid) -> Result<()> {
    let plan = scheduler.get_plan(plan_id).await?;
    let rendered = PlanFile::from_plan(&plan)
        .to_toml_string()
        .context("failed to render plan as TOML")?;
    print!("{rendered}");
    Ok(())
}
