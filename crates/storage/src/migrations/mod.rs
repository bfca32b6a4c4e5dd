//! Idempotent maintenance procedures.
//!
//! Each migration scans the table in bounded pages, rewrites only items that
//! need it, and can be re-run or resumed after a crash without harm: running
//! a migration twice leaves the table byte-identical to running it once.
//! Per-item failures are recorded and skipped, never fatal to the run.

mod job_indexes;
mod plan_layout;
mod testcase_count;

pub use job_indexes::backfill_job_indexes;
pub use plan_layout::{cleanup_legacy_plans, migrate_plan_layout};
pub use testcase_count::backfill_test_case_counts;

use algoprep_core::storage::RepositoryError;

/// Knobs shared by every migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Report what would change without writing anything.
    pub dry_run: bool,
    /// Items fetched per scan page.
    pub page_size: u32,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            page_size: 100,
        }
    }
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Items examined.
    pub scanned: u64,
    /// Items rewritten (or that would be, under dry-run).
    pub updated: u64,
    /// Items already in the target shape.
    pub skipped: u64,
    /// Items that failed; details in `failures`.
    pub errored: u64,
    pub failures: Vec<String>,
}

impl MigrationReport {
    pub(crate) fn failure(&mut self, context: &str, err: &RepositoryError) {
        self.errored += 1;
        self.failures.push(format!("{context}: {err}"));
    }

    pub fn is_clean(&self) -> bool {
        self.errored == 0
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned {}, updated {}, skipped {}, errored {}",
            self.scanned, self.updated, self.skipped, self.errored
        )
    }
}
