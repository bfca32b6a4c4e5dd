//! End-to-end repository tests against the in-memory backends. The exact
//! repository code paths that run against DynamoDB run here: key building,
//! envelope codecs, sparse index projections, pagination, blob offload.

use uuid::Uuid;

use algoprep_core::model::{
    JobStatus, JobType, NewProgress, Problem, ProblemExtractionJob, ScriptGenerationJob,
    SearchHistory, SubscriptionPlan, UsageLog, User,
};
use algoprep_core::storage::{
    JobRepository, PlanRepository, ProblemRepository, ProgressRepository, RepositoryError,
    SearchHistoryRepository, UsageRepository, UserRepository,
};
use algoprep_storage::blob::MemoryBlobStore;
use algoprep_storage::store::MemoryTableStore;
use algoprep_storage::{SingleTableRepository, StorageConfig};

type TestRepo = SingleTableRepository<MemoryTableStore, MemoryBlobStore>;

fn repo() -> (TestRepo, MemoryTableStore, MemoryBlobStore) {
    let store = MemoryTableStore::new();
    let blobs = MemoryBlobStore::new();
    let repo = SingleTableRepository::new(store.clone(), blobs.clone(), &StorageConfig::default());
    (repo, store, blobs)
}

async fn seed_problem(repo: &TestRepo) -> Problem {
    let problem = Problem::new("codeforces", "2149G", "Permutation Weights")
        .with_url("https://codeforces.com/problemset/problem/2149/G");
    repo.put_problem(&problem).await.unwrap();
    problem
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_create_and_lookups() {
    let (repo, _, _) = repo();
    let user = User::new("alice@example.com", "Alice").with_oauth("google", "123456789");
    repo.create_user(&user).await.unwrap();

    assert_eq!(repo.get_user(user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(
        repo.get_user_by_email("alice@example.com").await.unwrap(),
        Some(user.clone())
    );
    assert_eq!(
        repo.get_user_by_oauth("google", "123456789").await.unwrap(),
        Some(user.clone())
    );
    assert_eq!(repo.get_user_by_email("bob@example.com").await.unwrap(), None);
    assert_eq!(
        repo.get_user_by_oauth("github", "123456789").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (repo, _, _) = repo();
    repo.create_user(&User::new("alice@example.com", "Alice"))
        .await
        .unwrap();

    let dup = User::new("alice@example.com", "Other Alice");
    assert!(matches!(
        repo.create_user(&dup).await,
        Err(RepositoryError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn test_set_user_plan_and_fallback() {
    let (repo, _, _) = repo();
    let user = User::new("alice@example.com", "Alice");
    repo.create_user(&user).await.unwrap();

    repo.set_user_plan(user.id, Some("pro")).await.unwrap();
    let loaded = repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(loaded.plan_id.as_deref(), Some("pro"));
    assert_eq!(loaded.effective_plan_id(), "pro");

    repo.set_user_plan(user.id, None).await.unwrap();
    let loaded = repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(loaded.plan_id, None);
    assert_eq!(loaded.effective_plan_id(), "free");

    assert!(matches!(
        repo.set_user_plan(Uuid::new_v4(), Some("pro")).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_token_subject_hides_inactive_accounts() {
    let (repo, _, _) = repo();
    let mut user = User::new("alice@example.com", "Alice");
    repo.create_user(&user).await.unwrap();

    let subject = repo.token_subject("alice@example.com").await.unwrap();
    assert_eq!(subject.id, user.id);

    user.active = false;
    repo.update_user(&user).await.unwrap();
    assert!(matches!(
        repo.token_subject("alice@example.com").await,
        Err(RepositoryError::NotFound { .. })
    ));
    assert!(matches!(
        repo.token_subject("nobody@example.com").await,
        Err(RepositoryError::NotFound { .. })
    ));
}

// ============================================================================
// Problems and test cases
// ============================================================================

#[tokio::test]
async fn test_problem_upsert_and_get() {
    let (repo, _, _) = repo();
    let mut problem = seed_problem(&repo).await;

    problem.difficulty = Some(1800);
    repo.put_problem(&problem).await.unwrap();

    let loaded = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    assert_eq!(loaded.difficulty, Some(1800));
    assert_eq!(repo.get_problem("codeforces", "9999Z").await.unwrap(), None);
}

#[tokio::test]
async fn test_small_test_case_stays_inline() {
    let (repo, _, blobs) = repo();
    seed_problem(&repo).await;

    let index = repo
        .add_test_case("codeforces", "2149G", "3\n1 2 3\n", "6\n")
        .await
        .unwrap();
    assert_eq!(index, 0);
    assert_eq!(blobs.len().await, 0);

    let cases = repo.get_test_cases("codeforces", "2149G").await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].input, "3\n1 2 3\n");
}

#[tokio::test]
async fn test_large_test_case_offloads_and_rehydrates() {
    let (repo, _, blobs) = repo();
    seed_problem(&repo).await;

    let input = "9 8 7 6 5 4 3 2 1\n".repeat(4_000);
    assert!(input.len() > 50_000);
    repo.add_test_case("codeforces", "2149G", &input, "sorted\n")
        .await
        .unwrap();

    assert!(blobs.contains("testcases/codeforces/2149G/0.zst").await);

    let cases = repo.get_test_cases("codeforces", "2149G").await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].input, input);
    assert_eq!(cases[0].output, "sorted\n");
}

#[tokio::test]
async fn test_lost_blob_fails_loud() {
    let (repo, _, blobs) = repo();
    seed_problem(&repo).await;

    let input = "x".repeat(60_000);
    repo.add_test_case("codeforces", "2149G", &input, "y\n")
        .await
        .unwrap();
    blobs.corrupt_remove("testcases/codeforces/2149G/0.zst").await;

    assert!(matches!(
        repo.get_test_cases("codeforces", "2149G").await,
        Err(RepositoryError::BlobUnavailable(_))
    ));
}

#[tokio::test]
async fn test_test_case_count_converges() {
    let (repo, _, _) = repo();
    seed_problem(&repo).await;

    for i in 0..5 {
        let index = repo
            .add_test_case("codeforces", "2149G", &format!("in{i}"), &format!("out{i}"))
            .await
            .unwrap();
        assert_eq!(index, i);
    }

    let problem = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    assert_eq!(problem.test_case_count, 5);
    assert_eq!(repo.get_test_cases("codeforces", "2149G").await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_concurrent_adds_assign_distinct_indexes() {
    let (repo, _, _) = repo();
    seed_problem(&repo).await;

    let adds = (0..6).map(|i| {
        let repo = repo.clone();
        async move {
            repo.add_test_case("codeforces", "2149G", &format!("in{i}"), &format!("out{i}"))
                .await
        }
    });
    let mut indexes = futures_util::future::join_all(adds)
        .await
        .into_iter()
        .collect::<Result<Vec<u32>, _>>()
        .unwrap();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);

    let problem = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    assert_eq!(problem.test_case_count, 6);
    assert_eq!(repo.get_test_cases("codeforces", "2149G").await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_threshold_boundary_stays_inline() {
    let (repo, _, blobs) = repo();
    seed_problem(&repo).await;

    // Exactly at the threshold: inline.
    let input = "a".repeat(49_999);
    repo.add_test_case("codeforces", "2149G", &input, "b").await.unwrap();
    assert_eq!(blobs.len().await, 0);

    // One byte over: offloaded.
    let input = "a".repeat(50_000);
    repo.add_test_case("codeforces", "2149G", &input, "b").await.unwrap();
    assert_eq!(blobs.len().await, 1);
    assert!(blobs.contains("testcases/codeforces/2149G/1.zst").await);
}

#[tokio::test]
async fn test_put_test_cases_replaces_and_cleans_blobs() {
    let (repo, _, blobs) = repo();
    seed_problem(&repo).await;

    let big = "z".repeat(60_000);
    repo.add_test_case("codeforces", "2149G", &big, "a\n").await.unwrap();
    repo.add_test_case("codeforces", "2149G", "small", "b\n").await.unwrap();
    assert_eq!(blobs.len().await, 1);

    let replacement = vec![
        ("1\n".to_string(), "1\n".to_string()),
        ("2\n".to_string(), "4\n".to_string()),
        ("3\n".to_string(), "9\n".to_string()),
    ];
    let count = repo
        .put_test_cases("codeforces", "2149G", &replacement)
        .await
        .unwrap();
    assert_eq!(count, 3);
    // Old offloaded payload is gone with its item.
    assert_eq!(blobs.len().await, 0);

    let cases = repo.get_test_cases("codeforces", "2149G").await.unwrap();
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[1].output, "4\n");
    let problem = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    assert_eq!(problem.test_case_count, 3);
}

#[tokio::test]
async fn test_add_test_case_to_missing_problem() {
    let (repo, _, _) = repo();
    assert!(matches!(
        repo.add_test_case("codeforces", "0A", "in", "out").await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_status_listing_moves_on_completion() {
    let (repo, _, _) = repo();
    seed_problem(&repo).await;

    let drafts = repo.list_problems_by_status(false, 10, None).await.unwrap();
    assert_eq!(drafts.items.len(), 1);
    assert!(repo
        .list_problems_by_status(true, 10, None)
        .await
        .unwrap()
        .items
        .is_empty());

    repo.set_problem_completed("codeforces", "2149G", true)
        .await
        .unwrap();

    assert!(repo
        .list_problems_by_status(false, 10, None)
        .await
        .unwrap()
        .items
        .is_empty());
    let completed = repo.list_problems_by_status(true, 10, None).await.unwrap();
    assert_eq!(completed.items.len(), 1);
    assert!(completed.items[0].completed);
}

#[tokio::test]
async fn test_soft_delete_and_undelete() {
    let (repo, _, _) = repo();
    seed_problem(&repo).await;

    repo.soft_delete_problem("codeforces", "2149G", "duplicate of 2149F")
        .await
        .unwrap();

    // Data survives, listings do not show it.
    let problem = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    let deletion = problem.deleted.clone().unwrap();
    assert_eq!(deletion.reason, "duplicate of 2149F");
    assert!(repo
        .list_problems_by_status(false, 10, None)
        .await
        .unwrap()
        .items
        .is_empty());

    repo.undelete_problem("codeforces", "2149G").await.unwrap();
    let problem = repo.get_problem("codeforces", "2149G").await.unwrap().unwrap();
    assert!(problem.deleted.is_none());
    assert_eq!(
        repo.list_problems_by_status(false, 10, None)
            .await
            .unwrap()
            .items
            .len(),
        1
    );
}

#[tokio::test]
async fn test_delete_problem_cascades() {
    let (repo, store, blobs) = repo();
    seed_problem(&repo).await;
    repo.add_test_case("codeforces", "2149G", &"w".repeat(60_000), "x\n")
        .await
        .unwrap();
    repo.add_test_case("codeforces", "2149G", "small", "y\n")
        .await
        .unwrap();

    repo.delete_problem("codeforces", "2149G").await.unwrap();

    assert_eq!(repo.get_problem("codeforces", "2149G").await.unwrap(), None);
    assert!(repo.get_test_cases("codeforces", "2149G").await.unwrap().is_empty());
    assert_eq!(store.len().await, 0);
    assert_eq!(blobs.len().await, 0);
}

#[tokio::test]
async fn test_problem_pagination_is_exact() {
    let (repo, _, _) = repo();
    for i in 0..15 {
        let mut problem = Problem::new("codeforces", format!("{i}A"), format!("Problem {i}"));
        problem.updated_at = chrono::DateTime::from_timestamp(1_700_000_000 + i, 0).unwrap();
        problem.created_at = problem.updated_at;
        repo.put_problem(&problem).await.unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = repo
            .list_problems_by_status(false, 5, cursor.take())
            .await
            .unwrap();
        pages += 1;
        seen.extend(page.items.into_iter().map(|p| p.problem_id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 15);
    // Newest first, no duplicates, no gaps.
    assert_eq!(seen.first().map(String::as_str), Some("14A"));
    assert_eq!(seen.last().map(String::as_str), Some("0A"));
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 15);
}

// ============================================================================
// Jobs and progress
// ============================================================================

#[tokio::test]
async fn test_job_lifecycle_moves_between_status_listings() {
    let (repo, _, _) = repo();
    let job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    repo.create_script_job(&job).await.unwrap();

    let pending = repo
        .list_jobs_by_status(JobType::ScriptGeneration, JobStatus::Pending, 10, None)
        .await
        .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].job_id, job.job_id);

    repo.update_job_status(JobType::ScriptGeneration, job.job_id, JobStatus::Completed)
        .await
        .unwrap();

    assert!(repo
        .list_jobs_by_status(JobType::ScriptGeneration, JobStatus::Pending, 10, None)
        .await
        .unwrap()
        .items
        .is_empty());
    let completed = repo
        .list_jobs_by_status(JobType::ScriptGeneration, JobStatus::Completed, 10, None)
        .await
        .unwrap();
    assert_eq!(completed.items.len(), 1);

    let loaded = repo.get_script_job(job.job_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_create_job_is_idempotency_guarded() {
    let (repo, _, _) = repo();
    let job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    repo.create_script_job(&job).await.unwrap();
    assert!(matches!(
        repo.create_script_job(&job).await,
        Err(RepositoryError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn test_fail_job_records_message() {
    let (repo, _, _) = repo();
    let job = ProblemExtractionJob::new("https://codeforces.com/problemset/problem/2149/G");
    repo.create_extraction_job(&job).await.unwrap();

    repo.fail_job(JobType::ProblemExtraction, job.job_id, "fetch timed out")
        .await
        .unwrap();

    let loaded = repo.get_extraction_job(job.job_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Failed);
    assert_eq!(loaded.error_message.as_deref(), Some("fetch timed out"));

    let failed = repo
        .list_jobs_by_status(JobType::ProblemExtraction, JobStatus::Failed, 10, None)
        .await
        .unwrap();
    assert_eq!(failed.items.len(), 1);
}

#[tokio::test]
async fn test_update_missing_job_is_not_found() {
    let (repo, _, _) = repo();
    assert!(matches!(
        repo.update_job_status(JobType::ScriptGeneration, Uuid::new_v4(), JobStatus::Completed)
            .await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_script_jobs_for_problem() {
    let (repo, _, _) = repo();
    for _ in 0..3 {
        repo.create_script_job(&ScriptGenerationJob::new("codeforces", "2149G", "python"))
            .await
            .unwrap();
    }
    repo.create_script_job(&ScriptGenerationJob::new("codeforces", "1000A", "rust"))
        .await
        .unwrap();

    let jobs = repo
        .list_script_jobs_for_problem("codeforces", "2149G")
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|j| j.problem_id == "2149G"));
}

#[tokio::test]
async fn test_progress_appends_in_order_and_pages() {
    let (repo, _, _) = repo();
    let job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    repo.create_script_job(&job).await.unwrap();

    for i in 0..7 {
        repo.append_progress(
            JobType::ScriptGeneration,
            job.job_id,
            &NewProgress {
                step: format!("step-{i}"),
                message: format!("message {i}"),
                status: JobStatus::Processing,
            },
        )
        .await
        .unwrap();
        // Entries in the same millisecond order by their tiebreak id, not by
        // insertion; space the appends out so the order assertion is exact.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let mut steps = Vec::new();
    let mut cursor = None;
    loop {
        let page = repo
            .list_progress(JobType::ScriptGeneration, job.job_id, 3, cursor.take())
            .await
            .unwrap();
        steps.extend(page.items.into_iter().map(|e| e.step));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    let expected: Vec<String> = (0..7).map(|i| format!("step-{i}")).collect();
    assert_eq!(steps, expected);
}

#[tokio::test]
async fn test_delete_job_purges_progress() {
    let (repo, store, _) = repo();
    let job = ScriptGenerationJob::new("codeforces", "2149G", "python");
    repo.create_script_job(&job).await.unwrap();
    for _ in 0..4 {
        repo.append_progress(
            JobType::ScriptGeneration,
            job.job_id,
            &NewProgress {
                step: "llm".to_string(),
                message: "working".to_string(),
                status: JobStatus::Processing,
            },
        )
        .await
        .unwrap();
    }

    repo.delete_job(JobType::ScriptGeneration, job.job_id)
        .await
        .unwrap();

    assert_eq!(repo.get_script_job(job.job_id).await.unwrap(), None);
    let progress = repo
        .list_progress(JobType::ScriptGeneration, job.job_id, 10, None)
        .await
        .unwrap();
    assert!(progress.items.is_empty());
    assert_eq!(store.len().await, 0);
}

// ============================================================================
// Search history
// ============================================================================

#[tokio::test]
async fn test_history_user_feed_newest_first() {
    let (repo, _, _) = repo();
    let user_id = Uuid::new_v4();
    for i in 0..3 {
        let mut entry = SearchHistory::new(user_id, "codeforces", format!("{i}A"), "python", "pass");
        entry.created_at = chrono::DateTime::from_timestamp_millis(1_700_000_000_000 + i).unwrap();
        entry.updated_at = entry.created_at;
        repo.create_history(&entry).await.unwrap();
    }

    let page = repo.list_history_for_user(user_id, 10, None).await.unwrap();
    let ids: Vec<String> = page.items.iter().map(|e| e.problem_id.clone()).collect();
    assert_eq!(ids, vec!["2A", "1A", "0A"]);

    let other = repo
        .list_history_for_user(Uuid::new_v4(), 10, None)
        .await
        .unwrap();
    assert!(other.items.is_empty());
}

#[tokio::test]
async fn test_public_flag_controls_feed_membership() {
    let (repo, store, _) = repo();
    let entry = SearchHistory::new(Uuid::new_v4(), "codeforces", "2149G", "python", "print(1)");
    repo.create_history(&entry).await.unwrap();

    assert!(repo.list_public_history(10, None).await.unwrap().items.is_empty());

    repo.set_history_public(entry.id, true).await.unwrap();
    let feed = repo.list_public_history(10, None).await.unwrap();
    assert_eq!(feed.items.len(), 1);
    assert!(feed.items[0].public);

    repo.set_history_public(entry.id, false).await.unwrap();
    assert!(repo.list_public_history(10, None).await.unwrap().items.is_empty());

    // The item itself carries no feed attributes once private again.
    let raw = store
        .raw_item(&format!("HIST#{}", entry.id), "META")
        .await
        .unwrap();
    assert!(!raw.contains_key("GSI2PK"));
    assert!(!raw.contains_key("GSI2SK"));
}

#[tokio::test]
async fn test_history_id_reuse_rejected() {
    let (repo, _, _) = repo();
    let entry = SearchHistory::new(Uuid::new_v4(), "codeforces", "2149G", "python", "x");
    repo.create_history(&entry).await.unwrap();
    assert!(matches!(
        repo.create_history(&entry).await,
        Err(RepositoryError::AlreadyExists { .. })
    ));
}

// ============================================================================
// Usage
// ============================================================================

#[tokio::test]
async fn test_usage_counts_per_user_and_day() {
    let (repo, _, _) = repo();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let day = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    for i in 0..4 {
        let mut log = UsageLog::new(alice, "submission");
        log.recorded_at = day + chrono::Duration::minutes(i);
        repo.record_usage(&log).await.unwrap();
    }
    let mut other_day = UsageLog::new(alice, "submission");
    other_day.recorded_at = day + chrono::Duration::days(1);
    repo.record_usage(&other_day).await.unwrap();
    let mut bobs = UsageLog::new(bob, "generation");
    bobs.recorded_at = day;
    repo.record_usage(&bobs).await.unwrap();

    assert_eq!(
        repo.count_usage_for_day(alice, day.date_naive()).await.unwrap(),
        4
    );
    assert_eq!(
        repo.count_usage_for_day(alice, (day + chrono::Duration::days(1)).date_naive())
            .await
            .unwrap(),
        1
    );
    assert_eq!(repo.count_usage_for_day(bob, day.date_naive()).await.unwrap(), 1);

    let listed = repo
        .list_usage_for_day(alice, day.date_naive(), 10, None)
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 4);
    assert!(listed.items.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
}

// ============================================================================
// Plans
// ============================================================================

#[tokio::test]
async fn test_plans_share_one_partition() {
    let (repo, _, _) = repo();
    repo.put_plan(&SubscriptionPlan::free()).await.unwrap();
    let mut pro = SubscriptionPlan::free();
    pro.id = "pro".to_string();
    pro.name = "Pro".to_string();
    pro.price_cents = 900;
    pro.daily_submission_limit = 200;
    repo.put_plan(&pro).await.unwrap();

    assert_eq!(repo.get_plan("pro").await.unwrap().unwrap().price_cents, 900);
    assert_eq!(repo.get_plan("enterprise").await.unwrap(), None);

    let plans = repo.list_plans().await.unwrap();
    assert_eq!(plans.len(), 2);
    let ids: Vec<&str> = plans.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["free", "pro"]);
}
