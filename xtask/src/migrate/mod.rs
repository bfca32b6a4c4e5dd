//! Table migration and backfill commands.
//!
//! Thin CLI wrapper over the procedures in `algoprep_storage::migrations`.
//! Every migration is idempotent, so running `all` repeatedly is safe.

use crate::prelude::*;
use algoprep_storage::migrations::{
    backfill_job_indexes, backfill_test_case_counts, cleanup_legacy_plans, migrate_plan_layout,
    MigrationOptions, MigrationReport,
};
use algoprep_storage::store::DynamoTableStore;
use algoprep_storage::StorageConfig;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Storage error: {0}")]
    Storage(#[from] algoprep_core::storage::RepositoryError),

    #[error("{failed} of {total} migrations reported item failures")]
    Incomplete { failed: usize, total: usize },
}

/// Table migration commands.
#[derive(Debug, clap::Parser)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum MigrateAction {
    /// Move legacy per-plan partitions into the shared plan partition.
    PlanLayout(MigrateArgs),

    /// Delete legacy plan rows whose migrated counterpart exists.
    PlanCleanup(MigrateArgs),

    /// Restore missing job listing index attributes.
    JobIndexes(MigrateArgs),

    /// Repair drifted cached test-case counts.
    TestcaseCounts(MigrateArgs),

    /// Run every migration in order.
    All(MigrateArgs),
}

#[derive(Debug, clap::Args)]
pub struct MigrateArgs {
    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Items fetched per scan page.
    #[arg(long, default_value = "100")]
    pub page_size: u32,

    /// Table name to use.
    #[arg(long, default_value = "algoprep")]
    pub table_name: String,
}

impl MigrateArgs {
    fn options(&self) -> MigrationOptions {
        MigrationOptions {
            dry_run: self.dry_run,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    PlanLayout,
    PlanCleanup,
    JobIndexes,
    TestcaseCounts,
}

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::PlanLayout => "plan-layout",
            Step::PlanCleanup => "plan-cleanup",
            Step::JobIndexes => "job-indexes",
            Step::TestcaseCounts => "testcase-counts",
        }
    }
}

/// Main entry point for the migrate command.
pub async fn run(command: MigrateCommand, global: crate::Global) -> Result<()> {
    let (args, steps): (&MigrateArgs, Vec<Step>) = match &command.action {
        MigrateAction::PlanLayout(args) => (args, vec![Step::PlanLayout]),
        MigrateAction::PlanCleanup(args) => (args, vec![Step::PlanCleanup]),
        MigrateAction::JobIndexes(args) => (args, vec![Step::JobIndexes]),
        MigrateAction::TestcaseCounts(args) => (args, vec![Step::TestcaseCounts]),
        MigrateAction::All(args) => (
            args,
            vec![
                Step::PlanLayout,
                Step::PlanCleanup,
                Step::JobIndexes,
                Step::TestcaseCounts,
            ],
        ),
    };

    let mut config = StorageConfig::from_env();
    config.table_name = args.table_name.clone();
    let store = DynamoTableStore::from_config(&config).await;
    let options = args.options();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Table:"), config.table_name);
        if options.dry_run {
            aprintln!("{}", p_y("Dry run: nothing will be written."));
        }
        aprintln!();
    }

    let total = steps.len();
    let mut failed = 0usize;

    for step in steps {
        let report = run_step(step, &store, &options).await?;
        print_report(step.name(), &report, &global);
        if !report.is_clean() {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(MigrateError::Incomplete { failed, total });
    }
    Ok(())
}

async fn run_step(
    step: Step,
    store: &DynamoTableStore,
    options: &MigrationOptions,
) -> Result<MigrationReport> {
    let report = match step {
        Step::PlanLayout => migrate_plan_layout(store, options).await?,
        Step::PlanCleanup => cleanup_legacy_plans(store, options).await?,
        Step::JobIndexes => backfill_job_indexes(store, options).await?,
        Step::TestcaseCounts => backfill_test_case_counts(store, options).await?,
    };
    Ok(report)
}

fn print_report(name: &str, report: &MigrationReport, global: &crate::Global) {
    if global.is_silent() {
        return;
    }

    let summary = format!("{name}: {report}");
    if report.is_clean() {
        aprintln!("{}", p_g(&summary));
    } else {
        aprintln!("{}", p_r(&summary));
        for failure in &report.failures {
            aprintln!("  {}", p_r(failure));
        }
    }
}
