use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::{
    JobStatus, JobSummary, JobType, NewProgress, Problem, ProblemExtractionJob, ProgressEntry,
    ScriptGenerationJob, SearchHistory, SubscriptionPlan, TestCase, UsageLog, User,
};

use super::{Page, Result};

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a new user. Fails with `AlreadyExists` if the id or the email
    /// is already taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Gets a user by id.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets a user by email address.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Gets a user by external OAuth identity.
    async fn get_user_by_oauth(&self, provider: &str, subject: &str) -> Result<Option<User>>;

    /// Updates an existing user.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Sets or clears the user's subscription plan reference.
    async fn set_user_plan(&self, id: Uuid, plan_id: Option<&str>) -> Result<()>;
}

/// Repository for problems and their test cases.
#[async_trait]
pub trait ProblemRepository: Send + Sync {
    /// Creates or replaces a problem (idempotent upsert).
    async fn put_problem(&self, problem: &Problem) -> Result<()>;

    /// Gets a problem by its judge coordinates.
    async fn get_problem(&self, platform: &str, problem_id: &str) -> Result<Option<Problem>>;

    /// Lists completed or draft problems ordered by update time, newest first.
    /// Never scans, regardless of table size.
    async fn list_problems_by_status(
        &self,
        completed: bool,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<Problem>>;

    /// Appends one test case and returns its index. The parent's cached
    /// `test_case_count` is updated in the same call.
    async fn add_test_case(
        &self,
        platform: &str,
        problem_id: &str,
        input: &str,
        output: &str,
    ) -> Result<u32>;

    /// Replaces all test cases with the given `(input, output)` pairs and
    /// returns the new count. Inserts fan out concurrently.
    async fn put_test_cases(
        &self,
        platform: &str,
        problem_id: &str,
        cases: &[(String, String)],
    ) -> Result<u32>;

    /// Gets all test cases, rehydrating offloaded payloads.
    async fn get_test_cases(&self, platform: &str, problem_id: &str) -> Result<Vec<TestCase>>;

    /// Moves the problem between the draft and completed listings.
    async fn set_problem_completed(
        &self,
        platform: &str,
        problem_id: &str,
        completed: bool,
    ) -> Result<()>;

    /// Marks the problem deleted without removing any data.
    async fn soft_delete_problem(
        &self,
        platform: &str,
        problem_id: &str,
        reason: &str,
    ) -> Result<()>;

    /// Removes the soft-delete marker entirely.
    async fn undelete_problem(&self, platform: &str, problem_id: &str) -> Result<()>;

    /// Physically deletes the problem, its test cases, and any offloaded
    /// payloads (application-level cascade).
    async fn delete_problem(&self, platform: &str, problem_id: &str) -> Result<()>;
}

/// Repository for background jobs.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Creates a script-generation job. Fails with `AlreadyExists` on id
    /// reuse, so task re-execution cannot double-create.
    async fn create_script_job(&self, job: &ScriptGenerationJob) -> Result<()>;

    /// Creates a problem-extraction job. Same idempotency contract as
    /// [`Self::create_script_job`].
    async fn create_extraction_job(&self, job: &ProblemExtractionJob) -> Result<()>;

    /// Gets a script-generation job by id.
    async fn get_script_job(&self, id: Uuid) -> Result<Option<ScriptGenerationJob>>;

    /// Gets a problem-extraction job by id.
    async fn get_extraction_job(&self, id: Uuid) -> Result<Option<ProblemExtractionJob>>;

    /// Updates the job's status. The status field and the derived
    /// status-index attributes change in the same write, so a status listing
    /// immediately reflects the move.
    async fn update_job_status(&self, job_type: JobType, id: Uuid, status: JobStatus)
        -> Result<()>;

    /// Marks the job failed and records the error message.
    async fn fail_job(&self, job_type: JobType, id: Uuid, message: &str) -> Result<()>;

    /// Lists jobs of one type in one status, oldest first.
    async fn list_jobs_by_status(
        &self,
        job_type: JobType,
        status: JobStatus,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<JobSummary>>;

    /// Lists all script-generation jobs ever created for a problem.
    async fn list_script_jobs_for_problem(
        &self,
        platform: &str,
        problem_id: &str,
    ) -> Result<Vec<ScriptGenerationJob>>;

    /// Deletes the job and its progress history (application-level cascade).
    async fn delete_job(&self, job_type: JobType, id: Uuid) -> Result<()>;
}

/// Repository for the append-only job progress log.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Appends one progress entry, stamped with the current time.
    async fn append_progress(
        &self,
        job_type: JobType,
        job_id: Uuid,
        entry: &NewProgress,
    ) -> Result<()>;

    /// Lists progress entries in insertion order with forward pagination.
    async fn list_progress(
        &self,
        job_type: JobType,
        job_id: Uuid,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<ProgressEntry>>;

    /// Deletes all progress entries for a job, returning how many were removed.
    async fn purge_progress(&self, job_type: JobType, job_id: Uuid) -> Result<u32>;
}

/// Repository for submission history.
#[async_trait]
pub trait SearchHistoryRepository: Send + Sync {
    /// Creates a history entry. Fails with `AlreadyExists` on id reuse.
    async fn create_history(&self, history: &SearchHistory) -> Result<()>;

    /// Gets a history entry by id.
    async fn get_history(&self, id: Uuid) -> Result<Option<SearchHistory>>;

    /// Lists a user's history, newest first.
    async fn list_history_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<SearchHistory>>;

    /// Adds or removes the entry from the public feed. Turning public off
    /// removes the feed index attributes from the item entirely.
    async fn set_history_public(&self, id: Uuid, public: bool) -> Result<()>;

    /// Lists public history entries, newest first.
    async fn list_public_history(
        &self,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<SearchHistory>>;
}

/// Repository for per-day usage tracking.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Records one usage event.
    async fn record_usage(&self, log: &UsageLog) -> Result<()>;

    /// Counts a user's events for one day. Used by quota checks.
    async fn count_usage_for_day(&self, user_id: Uuid, day: NaiveDate) -> Result<u64>;

    /// Lists a user's events for one day in insertion order.
    async fn list_usage_for_day(
        &self,
        user_id: Uuid,
        day: NaiveDate,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<UsageLog>>;
}

/// Repository for subscription plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Creates or replaces a plan.
    async fn put_plan(&self, plan: &SubscriptionPlan) -> Result<()>;

    /// Gets a plan by id.
    async fn get_plan(&self, id: &str) -> Result<Option<SubscriptionPlan>>;

    /// Lists all plans with a single-partition query, no scan.
    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>>;
}
