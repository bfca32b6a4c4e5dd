//! Demo data seeding for local development.
//!
//! Inserts the built-in subscription plans and one draft problem with a
//! handful of test cases, so a fresh table has something to browse.

use super::error::Result;
use algoprep_core::model::{Problem, SubscriptionPlan};
use algoprep_core::storage::{PlanRepository, ProblemRepository};
use algoprep_storage::blob::S3BlobStore;
use algoprep_storage::store::DynamoTableStore;
use algoprep_storage::{SingleTableRepository, StorageConfig};
use chrono::Utc;

/// What a seed run will write, computed up front so it can be shown and
/// confirmed before any I/O happens.
pub struct SeedData {
    pub plans: Vec<SubscriptionPlan>,
    pub problem: Problem,
    pub test_cases: Vec<(String, String)>,
}

/// Pure function: the canonical demo data set.
pub fn demo_seed_data() -> SeedData {
    let now = Utc::now();
    let pro = SubscriptionPlan {
        id: "pro".to_string(),
        name: "Pro".to_string(),
        price_cents: 900,
        daily_submission_limit: 500,
        daily_generation_limit: 50,
        created_at: now,
        updated_at: now,
    };

    let problem = Problem::new("codeforces", "4A", "Watermelon")
        .with_url("https://codeforces.com/problemset/problem/4/A");

    let test_cases = vec![
        ("8\n".to_string(), "YES\n".to_string()),
        ("2\n".to_string(), "NO\n".to_string()),
        ("7\n".to_string(), "NO\n".to_string()),
        ("100\n".to_string(), "YES\n".to_string()),
    ];

    SeedData {
        plans: vec![SubscriptionPlan::free(), pro],
        problem,
        test_cases,
    }
}

/// Builds the repository the seed writes through.
pub async fn open_repository(
    table_name: &str,
) -> SingleTableRepository<DynamoTableStore, S3BlobStore> {
    let mut config = StorageConfig::from_env();
    config.table_name = table_name.to_string();
    let store = DynamoTableStore::from_config(&config).await;
    let blobs = S3BlobStore::from_config(&config).await;
    SingleTableRepository::new(store, blobs, &config)
}

/// Writes the seed data. Returns the number of items written (plans, the
/// problem, and its test cases). Re-running overwrites the same rows.
pub async fn apply_seed(
    repository: &SingleTableRepository<DynamoTableStore, S3BlobStore>,
    data: &SeedData,
) -> Result<u32> {
    let mut written = 0u32;

    for plan in &data.plans {
        repository.put_plan(plan).await?;
        written += 1;
    }

    repository.put_problem(&data.problem).await?;
    written += 1;

    let count = repository
        .put_test_cases(
            &data.problem.platform,
            &data.problem.problem_id,
            &data.test_cases,
        )
        .await?;
    written += count;

    Ok(written)
}
