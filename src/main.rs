//! Snapshot Lifecycle
//!
//! Applies the tiered retention policy to the `snapshots/` prefix of a bucket.
//! Intended to run hourly from a scheduler; each run is independent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use common::cli::utils::{
    handle_common_command, init_logging, load_config, validate_config, version_info,
};
use common::cli::{CommonArgs, CommonCommands, StoreArgs};
use common::config::Configuration;
use common::storage::create_object_store;
use retention::{
    Clock, FixedClock, ObjectStoreSnapshotStore, RetentionExecutor, RetentionMetrics, RunPlan,
    SystemClock,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "snapshot-lifecycle", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the retention policy and delete expired snapshots
    Run(StoreArgs),
    /// Show what a run would keep and delete without deleting anything
    Plan {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long, help = "Print the plan as JSON")]
        json: bool,
    },
    #[command(flatten)]
    Common(CommonCommands),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let mut config = load_config(cli.common.config.as_ref())?;

    match cli.command {
        Command::Common(command) => {
            handle_common_command(&command, &config, &binary_version())
        }
        Command::Run(store) => {
            store.apply(&mut config);
            run(&config, clock(store.now).as_ref()).await
        }
        Command::Plan { store, json } => {
            store.apply(&mut config);
            plan(&config, clock(store.now).as_ref(), json).await
        }
    }
}

fn binary_version() -> String {
    version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn clock(now: Option<DateTime<Utc>>) -> Box<dyn Clock> {
    match now {
        Some(now) => Box::new(FixedClock(now)),
        None => Box::new(SystemClock),
    }
}

fn build_executor(config: &Configuration) -> Result<RetentionExecutor> {
    validate_config(config)?;

    let object_store = create_object_store(&config.storage)
        .with_context(|| format!("Failed to open bucket '{}'", config.storage.bucket))?;
    let store = Arc::new(ObjectStoreSnapshotStore::new(object_store));

    RetentionExecutor::from_config(store, &config.retention, RetentionMetrics::new())
        .context("Invalid retention configuration")
}

async fn run(config: &Configuration, clock: &dyn Clock) -> Result<()> {
    let executor = build_executor(config)?;
    // Read once so every snapshot is judged against the same instant.
    let now = clock.now();

    info!(
        bucket = %config.storage.bucket,
        now = %now.to_rfc3339(),
        dry_run = config.retention.dry_run,
        strict = config.retention.strict,
        "Running snapshot lifecycle"
    );

    let report = executor
        .apply(now)
        .await
        .context("Retention run aborted")?;

    if config.retention.strict && !report.is_success() {
        anyhow::bail!(
            "{} of {} snapshot deletions failed",
            report.failures.len(),
            report.failures.len() + report.total_deleted()
        );
    }

    Ok(())
}

async fn plan(config: &Configuration, clock: &dyn Clock, json: bool) -> Result<()> {
    let executor = build_executor(config)?;
    let now = clock.now();

    let plan = executor
        .plan(now)
        .await
        .context("Failed to plan retention run")?;

    if json {
        println!("{}", plan_to_json(&plan, now)?);
    } else {
        print!("{}", render_plan(&plan, now));
    }

    Ok(())
}

fn plan_to_json(plan: &RunPlan, now: DateTime<Utc>) -> Result<String> {
    let value = serde_json::json!({
        "now": now.to_rfc3339(),
        "listed": plan.listed.len(),
        "keep": plan.keep,
        "delete": plan.to_delete,
        "invalid": plan.invalid,
    });
    serde_json::to_string_pretty(&value).context("Failed to serialize plan to JSON")
}

fn render_plan(plan: &RunPlan, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "Retention plan as of {} ({} snapshots listed)\n",
        now.to_rfc3339(),
        plan.listed.len()
    );

    for (label, ids) in [
        ("Keep", &plan.keep),
        ("Delete", &plan.to_delete),
        ("Invalid", &plan.invalid),
    ] {
        out.push_str(&format!("{label} ({}):\n", ids.len()));
        for id in ids {
            out.push_str(&format!("  {id}\n"));
        }
    }

    out
}
