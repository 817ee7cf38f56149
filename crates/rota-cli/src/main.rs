mod config;
mod exercise_cmds;
mod plan_cmds;
mod schedule_cmds;
mod serve_cmd;

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use rota_core::store::{PgStore, SystemClock};
use rota_core::{RescheduleScope, Scheduler};
use rota_db::pool;

use config::RotaConfig;

#[derive(Parser)]
#[command(name = "rota", about = "Recurring workout scheduler")]
struct Cli {
    /// Database URL (overrides ROTA_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a rota config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/rota")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the rota database
    DbInit,
    /// Exercise catalog management
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Materialize a plan's template into dated instances
    Generate {
        /// Plan ID
        plan_id: Uuid,
        /// First date (defaults to today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (defaults to today plus the configured horizon)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// List scheduled instances
    List {
        /// First date (defaults to today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (defaults to six days after --from)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only instances of this plan
        #[arg(long)]
        plan: Option<Uuid>,
        /// Include hidden tombstones
        #[arg(long)]
        include_hidden: bool,
    },
    /// Add a one-off instance outside any plan
    Add {
        /// Catalog exercise id (e.g. squat)
        exercise_id: String,
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
        #[arg(long)]
        sets: i32,
        #[arg(long)]
        reps: i32,
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reschedule an instance
    Move {
        /// Instance ID
        instance_id: Uuid,
        /// New date (YYYY-MM-DD)
        new_date: NaiveDate,
        /// this_week or whole_plan
        #[arg(long, default_value = "this_week")]
        scope: RescheduleScope,
    },
    /// Mark an instance completed
    Done {
        /// Instance ID
        instance_id: Uuid,
    },
    /// Clear an instance's completion
    Undone {
        /// Instance ID
        instance_id: Uuid,
    },
    /// Delete an instance
    Delete {
        /// Instance ID
        instance_id: Uuid,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum ExerciseCommands {
    /// Add a catalog entry
    Add {
        /// Exercise id (slug, e.g. squat)
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Category id (e.g. legs)
        #[arg(long)]
        category: String,
    },
    /// List the catalog
    List,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a plan from a TOML file
    Create {
        /// Path to the plan TOML file
        file: String,
    },
    /// Show plan details (or list all plans)
    Show {
        /// Plan ID to show (omit to list all)
        plan_id: Option<Uuid>,
        /// Print the plan as a TOML plan file
        #[arg(long)]
        toml: bool,
    },
}

/// Execute the `rota init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        schedule: rota_core::SchedulerConfig::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  schedule.horizon_days = {}", cfg.schedule.horizon_days);
    println!();
    println!("Next: run `rota db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `rota db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = RotaConfig::resolve(cli_db_url)?;

    println!("Initializing rota database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let summary = pool::schedule_summary(&db_pool).await?;
    println!("Database ready.");
    println!("  exercises:  {}", summary.exercises);
    println!("  plans:      {}", summary.plans);
    println!(
        "  instances:  {} ({} completed, {} ad hoc)",
        summary.instances, summary.completed, summary.ad_hoc
    );
    println!("  tombstones: {}", summary.tombstones);

    db_pool.close().await;

    println!("rota db-init complete.");
    Ok(())
}

fn build_scheduler(pool: &PgPool, resolved: &RotaConfig) -> Scheduler {
    Scheduler::with_pg(
        PgStore::new(pool.clone()),
        Arc::new(SystemClock),
        resolved.scheduler.clone(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Exercise { command } => {
            let resolved = RotaConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = exercise_cmds::run_exercise_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = RotaConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let scheduler = build_scheduler(&db_pool, &resolved);
            let result = plan_cmds::run_plan_command(command, &scheduler).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = RotaConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let scheduler = build_scheduler(&db_pool, &resolved);
            let result = serve_cmd::run_serve(scheduler.clone(), &bind, port).await;
            scheduler.drain_background().await;
            db_pool.close().await;
            result?;
        }
        command => {
            let resolved = RotaConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let scheduler = build_scheduler(&db_pool, &resolved);
            let result = schedule_cmds::run_schedule_command(command, &scheduler).await;
            scheduler.drain_background().await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
