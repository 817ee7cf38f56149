//! CLI handlers for the day-to-day scheduling commands.
//!
//! Implements:
//! - `rota generate <plan-id> [--from] [--to]`
//! - `rota list [--from] [--to] [--plan] [--include-hidden]`
//! - `rota add <exercise> <date> --sets --reps [--weight] [--notes]`
//! - `rota move <instance-id> <new-date> [--scope this_week|whole_plan]`
//! - `rota done|undone|delete <instance-id>`

use anyhow::{Result, bail};
use chrono::NaiveDate;
use uuid::Uuid;

use rota_core::dates;
use rota_core::instances::NewAdHocInstance;
use rota_core::store::{InstanceFilter, ScheduledInstance};
use rota_core::{RescheduleReport, RescheduleScope, Scheduler};

use crate::Commands;

/// Dispatch a scheduling command. Other variants are handled in `main`.
pub async fn run_schedule_command(command: Commands, scheduler: &Scheduler) -> Result<()> {
    match command {
        Commands::Generate { plan_id, from, to } => cmd_generate(scheduler, plan_id, from, to).await,
        Commands::List {
            from,
            to,
            plan,
            include_hidden,
        } => cmd_list(scheduler, from, to, plan, include_hidden).await,
        Commands::Add {
            exercise_id,
            date,
            sets,
            reps,
            weight,
            notes,
        } => {
            let new = NewAdHocInstance {
                exercise_id,
                date,
                sets,
                reps,
                weight,
                weight_plates: None,
                notes,
            };
            cmd_add(scheduler, new).await
        }
        Commands::Move {
            instance_id,
            new_date,
            scope,
        } => cmd_move(scheduler, instance_id, new_date, scope).await,
        Commands::Done { instance_id } => {
            let instance = scheduler.mark_completed(instance_id).await?;
            println!("Marked {} completed.", describe(&instance));
            Ok(())
        }
        Commands::Undone { instance_id } => {
            let instance = scheduler.mark_incomplete(instance_id).await?;
            println!("Marked {} not completed.", describe(&instance));
            Ok(())
        }
        Commands::Delete { instance_id } => {
            scheduler.delete_instance(instance_id).await?;
            println!("Deleted instance {instance_id}.");
            Ok(())
        }
        _ => bail!("not a scheduling command"),
    }
}

// -----------------------------------------------------------------------
// rota generate
// -----------------------------------------------------------------------

async fn cmd_generate(
    scheduler: &Scheduler,
    plan_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let from = from.unwrap_or_else(|| scheduler.today());
    let to = to.unwrap_or_else(|| {
        dates::shift_by_days(from, i64::from(scheduler.config().horizon_days))
    });

    let report = scheduler.ensure_generated(plan_id, from, to).await?;
    println!(
        "Generated {} instance(s) for {from} to {to} ({} already present).",
        report.created, report.skipped
    );
    Ok(())
}

// -----------------------------------------------------------------------
// rota list
// -----------------------------------------------------------------------

async fn cmd_list(
    scheduler: &Scheduler,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    plan: Option<Uuid>,
    include_hidden: bool,
) -> Result<()> {
    let from = from.unwrap_or_else(|| scheduler.today());
    let to = to.unwrap_or_else(|| dates::shift_by_days(from, 6));
    let filter = InstanceFilter {
        workout_plan_id: plan,
        exercise_id: None,
        include_hidden,
    };

    let instances = scheduler.list_instances(from, to, &filter).await?;
    if instances.is_empty() {
        println!("Nothing scheduled between {from} and {to}.");
        return Ok(());
    }
    print_instances(&instances);
    Ok(())
}

fn print_instances(instances: &[ScheduledInstance]) {
    let ex_w = instances
        .iter()
        .map(|i| i.exercise_id.len())
        .max()
        .unwrap_or(8)
        .max(8);

    println!(
        "{:<36}  {:<10}  {:<3}  {:<ex_w$}  {:>9}  {:>7}  STATUS",
        "ID", "DATE", "DAY", "EXERCISE", "SETSxREPS", "WEIGHT",
    );
    for instance in instances {
        let volume = format!("{}x{}", instance.sets, instance.reps);
        let status = if instance.is_hidden {
            "hidden"
        } else if instance.completed {
            "done"
        } else if instance.workout_plan_id.is_none() {
            "ad hoc"
        } else {
            ""
        };
        println!(
            "{:<36}  {:<10}  {:<3}  {:<ex_w$}  {:>9}  {:>7}  {}",
            instance.id,
            instance.date,
            instance.date.format("%a"),
            instance.exercise_id,
            volume,
            instance.weight,
            status,
        );
    }
}

// -----------------------------------------------------------------------
// rota add / move
// -----------------------------------------------------------------------

async fn cmd_add(scheduler: &Scheduler, new: NewAdHocInstance) -> Result<()> {
    let instance = scheduler.create_ad_hoc(new).await?;
    println!("Added {} ({}).", describe(&instance), instance.id);
    Ok(())
}

async fn cmd_move(
    scheduler: &Scheduler,
    instance_id: Uuid,
    new_date: NaiveDate,
    scope: RescheduleScope,
) -> Result<()> {
    let report = scheduler.reschedule(instance_id, new_date, scope).await?;
    print_reschedule(&report);
    Ok(())
}

fn print_reschedule(report: &RescheduleReport) {
    println!("Moved {} ({scope}).", describe(&report.instance), scope = report.scope);
    if let Some(ref tombstone) = report.tombstone {
        println!("  Hidden the {} occurrence on {}.", tombstone.exercise_id, tombstone.date);
    }
    if report.scope == RescheduleScope::WholePlan {
        println!("  Shift:    {:+} day(s)", report.day_shift);
        println!("  Cascaded: {}", report.cascaded.len());
        if !report.skipped.is_empty() {
            println!("  Skipped:  {} (completed or removed)", report.skipped.len());
        }
    }
    if !report.failed.is_empty() {
        println!();
        println!("Warnings:");
        for failure in &report.failed {
            println!("  - {}: {}", failure.instance_id, failure.error);
        }
    }
}

fn describe(instance: &ScheduledInstance) -> String {
    format!(
        "{} {}x{} @ {} on {}",
        instance.exercise_id, instance.sets, instance.reps, instance.weight, instance.date
    )
}
