//! Migration tests against the in-memory store: each backfill must converge,
//! re-run clean, and leave untouched items alone.

use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::{
    JobStatus, JobType, Problem, ScriptGenerationJob, SubscriptionPlan,
};
use algoprep_core::storage::{JobRepository, PlanRepository, ProblemRepository};
use algoprep_storage::blob::MemoryBlobStore;
use algoprep_storage::conversions::{plan_to_item, script_job_to_item};
use algoprep_storage::envelope::{ATTR_GSI1_PK, ATTR_GSI1_SK, ATTR_KEY_VERSION, ATTR_PK, ATTR_SK};
use algoprep_storage::migrations::{
    backfill_job_indexes, backfill_test_case_counts, cleanup_legacy_plans, migrate_plan_layout,
    MigrationOptions,
};
use algoprep_storage::store::{MemoryTableStore, TableStore, UpdateAction};
use algoprep_storage::{SingleTableRepository, StorageConfig};

type TestRepo = SingleTableRepository<MemoryTableStore, MemoryBlobStore>;

fn repo() -> (TestRepo, MemoryTableStore) {
    let store = MemoryTableStore::new();
    let repo = SingleTableRepository::new(
        store.clone(),
        MemoryBlobStore::new(),
        &StorageConfig::default(),
    );
    (repo, store)
}

/// Writes a plan in the pre-migration shape: its own partition, `META` sort
/// key.
async fn seed_legacy_plan(store: &MemoryTableStore, plan: &SubscriptionPlan) {
    let mut item = plan_to_item(plan);
    item.insert(
        ATTR_PK.to_string(),
        AttributeValue::S(format!("PLAN#{}", plan.id)),
    );
    item.insert(ATTR_SK.to_string(), AttributeValue::S("META".to_string()));
    store.put_item(item).await.unwrap();
}

/// Writes a job in the pre-index shape: no status projection, old key
/// version.
async fn seed_old_job(store: &MemoryTableStore, job: &ScriptGenerationJob) {
    let mut item = script_job_to_item(job);
    item.remove(ATTR_GSI1_PK);
    item.remove(ATTR_GSI1_SK);
    item.insert(ATTR_KEY_VERSION.to_string(), AttributeValue::N("1".to_string()));
    store.put_item(item).await.unwrap();
}

#[tokio::test]
async fn test_plan_layout_migration_converges_and_reruns_clean() {
    let (repo, store) = repo();
    let mut pro = SubscriptionPlan::free();
    pro.id = "pro".to_string();
    pro.name = "Pro".to_string();
    seed_legacy_plan(&store, &pro).await;

    let options = MigrationOptions::default();
    let report = migrate_plan_layout(&store, &options).await.unwrap();
    assert_eq!((report.scanned, report.updated, report.skipped), (1, 1, 0));
    assert!(report.is_clean());

    // New shape answers reads; legacy item still present until cleanup.
    assert_eq!(repo.get_plan("pro").await.unwrap().unwrap().name, "Pro");
    assert!(store.raw_item("PLAN#pro", "META").await.is_some());

    // Second run changes nothing.
    let rerun = migrate_plan_layout(&store, &options).await.unwrap();
    assert_eq!((rerun.scanned, rerun.updated, rerun.skipped), (1, 0, 1));

    let cleanup = cleanup_legacy_plans(&store, &options).await.unwrap();
    assert_eq!(cleanup.updated, 1);
    assert!(store.raw_item("PLAN#pro", "META").await.is_none());
    assert_eq!(repo.get_plan("pro").await.unwrap().unwrap().name, "Pro");

    // Cleanup re-run finds nothing left to do.
    let rerun = cleanup_legacy_plans(&store, &options).await.unwrap();
    assert_eq!(rerun.scanned, 0);
}

#[tokio::test]
async fn test_cleanup_keeps_unmigrated_legacy_plans() {
    let (_, store) = repo();
    seed_legacy_plan(&store, &SubscriptionPlan::free()).await;

    let report = cleanup_legacy_plans(&store, &MigrationOptions::default())
        .await
        .unwrap();
    assert_eq!((report.updated, report.skipped), (0, 1));
    assert!(store.raw_item("PLAN#free", "META").await.is_some());
}

#[tokio::test]
async fn test_plan_migration_dry_run_writes_nothing() {
    let (repo, store) = repo();
    seed_legacy_plan(&store, &SubscriptionPlan::free()).await;

    let options = MigrationOptions {
        dry_run: true,
        ..MigrationOptions::default()
    };
    let report = migrate_plan_layout(&store, &options).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(store.len().await, 1);
    assert_eq!(repo.get_plan("free").await.unwrap(), None);
}

#[tokio::test]
async fn test_job_index_backfill_restores_status_listings() {
    let (repo, store) = repo();
    let old_job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    seed_old_job(&store, &old_job).await;
    let new_job = ScriptGenerationJob::new("codeforces", "1000A", "rust");
    repo.create_script_job(&new_job).await.unwrap();

    // The old-shape job is invisible to status listings.
    let pending = repo
        .list_jobs_by_status(JobType::ScriptGeneration, JobStatus::Pending, 10, None)
        .await
        .unwrap();
    assert_eq!(pending.items.len(), 1);

    let options = MigrationOptions::default();
    let report = backfill_job_indexes(&store, &options).await.unwrap();
    assert_eq!((report.scanned, report.updated, report.skipped), (2, 1, 1));

    let pending = repo
        .list_jobs_by_status(JobType::ScriptGeneration, JobStatus::Pending, 10, None)
        .await
        .unwrap();
    assert_eq!(pending.items.len(), 2);

    let raw = store
        .raw_item(&format!("SGJOB#{}", old_job.job_id), "META")
        .await
        .unwrap();
    assert!(raw.contains_key(ATTR_GSI1_PK));
    assert_eq!(raw.get(ATTR_KEY_VERSION).unwrap().as_n().unwrap(), "2");

    let rerun = backfill_job_indexes(&store, &options).await.unwrap();
    assert_eq!(rerun.updated, 0);
    assert_eq!(rerun.skipped, 2);
}

#[tokio::test]
async fn test_test_case_count_backfill_repairs_drift() {
    let (repo, store) = repo();
    repo.put_problem(&Problem::new("codeforces", "2149G", "Permutation Weights"))
        .await
        .unwrap();
    for i in 0..3 {
        repo.add_test_case("codeforces", "2149G", &format!("in{i}"), &format!("out{i}"))
            .await
            .unwrap();
    }

    // Simulate drift from a partial bulk write.
    store
        .update_item(
            "PROB#codeforces#2149G",
            "META",
            vec![UpdateAction::set("dat.tcc", AttributeValue::N("7".to_string()))],
        )
        .await
        .unwrap();
    assert_eq!(
        repo.get_problem("codeforces", "2149G")
            .await
            .unwrap()
            .unwrap()
            .test_case_count,
        7
    );

    let options = MigrationOptions::default();
    let report = backfill_test_case_counts(&store, &options).await.unwrap();
    assert_eq!((report.scanned, report.updated), (1, 1));

    assert_eq!(
        repo.get_problem("codeforces", "2149G")
            .await
            .unwrap()
            .unwrap()
            .test_case_count,
        3
    );

    let rerun = backfill_test_case_counts(&store, &options).await.unwrap();
    assert_eq!((rerun.updated, rerun.skipped), (0, 1));
}

#[tokio::test]
async fn test_count_backfill_ignores_other_entities() {
    let (repo, store) = repo();
    repo.put_plan(&SubscriptionPlan::free()).await.unwrap();
    let job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    repo.create_script_job(&job).await.unwrap();

    let report = backfill_test_case_counts(&store, &MigrationOptions::default())
        .await
        .unwrap();
    assert_eq!(report.scanned, 0);
}

#[tokio::test]
async fn test_small_scan_pages_visit_everything() {
    let (repo, store) = repo();
    for i in 0..9 {
        let mut plan = SubscriptionPlan::free();
        plan.id = format!("plan-{i}");
        seed_legacy_plan(&store, &plan).await;
    }
    // Unrelated rows interleaved in the scan.
    repo.put_problem(&Problem::new("codeforces", "2149G", "Permutation Weights"))
        .await
        .unwrap();

    let options = MigrationOptions {
        dry_run: false,
        page_size: 2,
    };
    let report = migrate_plan_layout(&store, &options).await.unwrap();
    assert_eq!((report.scanned, report.updated), (9, 9));
}
