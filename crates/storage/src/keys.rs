//! Key generation for the single-table design.
//!
//! Pure functions, the single source of truth for every PK/SK/GSI format.
//! Once a format ships, existing items keep working; changing a format
//! requires an explicit migration, never a dual-read fallback in read paths.
//! Sort keys embedding timestamps are zero-padded so lexicographic order
//! equals chronological order.

use chrono::NaiveDate;
use uuid::Uuid;

use algoprep_core::model::{JobStatus, JobType};

/// Current key-format version, written as the `kv` attribute on every new
/// item. Migrations stamp it when they rewrite an item, so maintenance code
/// can tell old-shape rows apart without guessing from key patterns.
pub const KEY_VERSION: u32 = 2;

// ============================================================================
// Key prefixes
// ============================================================================

pub const USER_PREFIX: &str = "USER#";
pub const EMAIL_PREFIX: &str = "EMAIL#";
pub const OAUTH_PREFIX: &str = "OAUTH#";
pub const PROBLEM_PREFIX: &str = "PROB#";
pub const TEST_CASE_PREFIX: &str = "TC#";
pub const SCRIPT_JOB_PREFIX: &str = "SGJOB#";
pub const EXTRACTION_JOB_PREFIX: &str = "PEJOB#";
pub const JOB_PREFIX: &str = "JOB#";
pub const PROGRESS_PREFIX: &str = "PROG#";
pub const HISTORY_PREFIX: &str = "HIST#";
pub const USAGE_PREFIX: &str = "USAGE#";
pub const USAGE_LOG_PREFIX: &str = "ULOG#";
pub const PLAN_PARTITION: &str = "PLAN";

/// Sort key for the single metadata item of an entity partition.
pub const META_SK: &str = "META";

/// Public-feed partition for search history (sparse GSI2).
pub const PUBLIC_HISTORY_PK: &str = "PUBLIC#HIST";

// ============================================================================
// Timestamp padding
// ============================================================================

/// Zero-pad epoch seconds to 12 digits for lexicographic ordering.
pub fn pad_secs(secs: i64) -> String {
    format!("{:012}", secs.max(0))
}

/// Zero-pad epoch milliseconds to 14 digits for lexicographic ordering.
pub fn pad_millis(millis: i64) -> String {
    format!("{:014}", millis.max(0))
}

// ============================================================================
// User keys
// ============================================================================

/// Pattern: `USER#<user_id>`
pub fn user_pk(user_id: Uuid) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Pattern: `EMAIL#<email>` (GSI1 hash for email lookup)
pub fn user_gsi1_pk(email: &str) -> String {
    format!("{EMAIL_PREFIX}{email}")
}

/// Pattern: `USER#<user_id>` (GSI1 range)
pub fn user_gsi1_sk(user_id: Uuid) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Pattern: `OAUTH#<provider>#<subject>` (GSI2 hash for OAuth lookup)
pub fn user_gsi2_pk(provider: &str, subject: &str) -> String {
    format!("{OAUTH_PREFIX}{provider}#{subject}")
}

/// Pattern: `USER#<user_id>` (GSI2 range)
pub fn user_gsi2_sk(user_id: Uuid) -> String {
    format!("{USER_PREFIX}{user_id}")
}

// ============================================================================
// Problem and test-case keys
// ============================================================================

/// Pattern: `PROB#<platform>#<problem_id>`
pub fn problem_pk(platform: &str, problem_id: &str) -> String {
    format!("{PROBLEM_PREFIX}{platform}#{problem_id}")
}

/// Pattern: `TC#<index>` with the index zero-padded to 4 digits so test
/// cases list in order.
pub fn test_case_sk(index: u32) -> String {
    format!("{TEST_CASE_PREFIX}{index:04}")
}

/// Pattern: `PROB#COMPLETED` or `PROB#DRAFT` (GSI3 hash, the status bucket)
pub fn problem_gsi3_pk(completed: bool) -> String {
    if completed {
        format!("{PROBLEM_PREFIX}COMPLETED")
    } else {
        format!("{PROBLEM_PREFIX}DRAFT")
    }
}

/// Pattern: `<updated-secs:012>#<platform>#<problem_id>` (GSI3 range, so each
/// bucket lists by update time)
pub fn problem_gsi3_sk(updated_secs: i64, platform: &str, problem_id: &str) -> String {
    format!("{}#{platform}#{problem_id}", pad_secs(updated_secs))
}

// ============================================================================
// Job keys
// ============================================================================

fn job_prefix(job_type: JobType) -> &'static str {
    match job_type {
        JobType::ScriptGeneration => SCRIPT_JOB_PREFIX,
        JobType::ProblemExtraction => EXTRACTION_JOB_PREFIX,
    }
}

/// Pattern: `SGJOB#<job_id>` or `PEJOB#<job_id>`
pub fn job_pk(job_type: JobType, job_id: Uuid) -> String {
    format!("{}{job_id}", job_prefix(job_type))
}

/// Pattern: `SGJOB#STATUS#<status>` / `PEJOB#STATUS#<status>` (GSI1 hash)
pub fn job_gsi1_pk(job_type: JobType, status: JobStatus) -> String {
    format!("{}STATUS#{}", job_prefix(job_type), status.as_str())
}

/// Pattern: `<created-secs:012>#<job_id>` (GSI1 range, chronological within
/// one status bucket)
pub fn job_gsi1_sk(created_secs: i64, job_id: Uuid) -> String {
    format!("{}#{job_id}", pad_secs(created_secs))
}

/// Pattern: `SGJOB#<platform>#<problem_id>` (GSI2 hash, script-generation
/// jobs only: "jobs for this problem")
pub fn script_job_gsi2_pk(platform: &str, problem_id: &str) -> String {
    format!("{SCRIPT_JOB_PREFIX}{platform}#{problem_id}")
}

/// Pattern: `<created-secs:012>#<job_id>` (GSI2 range)
pub fn script_job_gsi2_sk(created_secs: i64, job_id: Uuid) -> String {
    format!("{}#{job_id}", pad_secs(created_secs))
}

// ============================================================================
// Job progress keys
// ============================================================================

/// Pattern: `JOB#<job_type>#<job_id>`
pub fn progress_pk(job_type: JobType, job_id: Uuid) -> String {
    format!("{JOB_PREFIX}{}#{job_id}", job_type.as_str())
}

/// Pattern: `PROG#<recorded-millis:014>#<entry_id>`
///
/// The entry id breaks ties between appends landing in the same millisecond.
pub fn progress_sk(recorded_millis: i64, entry_id: Uuid) -> String {
    format!("{PROGRESS_PREFIX}{}#{entry_id}", pad_millis(recorded_millis))
}

// ============================================================================
// Search history keys
// ============================================================================

/// Pattern: `HIST#<id>`
pub fn history_pk(id: Uuid) -> String {
    format!("{HISTORY_PREFIX}{id}")
}

/// Pattern: `USER#<user_id>` (GSI1 hash, "history by user")
pub fn history_gsi1_pk(user_id: Uuid) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Pattern: `HIST#<created-millis:014>` (GSI1 range)
pub fn history_gsi1_sk(created_millis: i64) -> String {
    format!("{HISTORY_PREFIX}{}", pad_millis(created_millis))
}

/// Pattern: `<created-millis:014>` (GSI2 range; GSI2 hash is
/// [`PUBLIC_HISTORY_PK`], present only while the entry is public)
pub fn history_gsi2_sk(created_millis: i64) -> String {
    pad_millis(created_millis)
}

// ============================================================================
// Usage keys
// ============================================================================

/// Pattern: `USAGE#<user_id>#<YYYY-MM-DD>`
pub fn usage_pk(user_id: Uuid, day: NaiveDate) -> String {
    format!("{USAGE_PREFIX}{user_id}#{}", day.format("%Y-%m-%d"))
}

/// Pattern: `ULOG#<recorded-millis:014>#<id>`
pub fn usage_sk(recorded_millis: i64, id: Uuid) -> String {
    format!("{USAGE_LOG_PREFIX}{}#{id}", pad_millis(recorded_millis))
}

// ============================================================================
// Subscription plan keys
// ============================================================================

/// Pattern: `PLAN` (shared partition: "list all plans" is one query)
pub fn plan_pk() -> String {
    PLAN_PARTITION.to_string()
}

/// Pattern: `META#<plan_id>`
pub fn plan_sk(plan_id: &str) -> String {
    format!("{META_SK}#{plan_id}")
}

/// Pattern: `PLAN#<plan_id>`, the pre-migration per-plan partition. Only the
/// plan-layout migration and its cleanup phase reference this.
pub fn legacy_plan_pk(plan_id: &str) -> String {
    format!("{PLAN_PARTITION}#{plan_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_user_keys() {
        let user_id = id("550e8400-e29b-41d4-a716-446655440001");
        assert_eq!(user_pk(user_id), "USER#550e8400-e29b-41d4-a716-446655440001");
        assert_eq!(user_gsi1_pk("john@example.com"), "EMAIL#john@example.com");
        assert_eq!(
            user_gsi2_pk("google", "123456789"),
            "OAUTH#google#123456789"
        );
    }

    #[test]
    fn test_problem_keys() {
        assert_eq!(problem_pk("codeforces", "2149G"), "PROB#codeforces#2149G");
        assert_eq!(test_case_sk(0), "TC#0000");
        assert_eq!(test_case_sk(42), "TC#0042");
    }

    #[test]
    fn test_problem_status_buckets() {
        assert_eq!(problem_gsi3_pk(true), "PROB#COMPLETED");
        assert_eq!(problem_gsi3_pk(false), "PROB#DRAFT");
        assert_eq!(
            problem_gsi3_sk(1_700_000_000, "codeforces", "2149G"),
            "001700000000#codeforces#2149G"
        );
    }

    #[test]
    fn test_job_keys() {
        let job_id = id("550e8400-e29b-41d4-a716-446655440002");
        assert_eq!(
            job_pk(JobType::ScriptGeneration, job_id),
            "SGJOB#550e8400-e29b-41d4-a716-446655440002"
        );
        assert_eq!(
            job_pk(JobType::ProblemExtraction, job_id),
            "PEJOB#550e8400-e29b-41d4-a716-446655440002"
        );
        assert_eq!(
            job_gsi1_pk(JobType::ScriptGeneration, JobStatus::Pending),
            "SGJOB#STATUS#PENDING"
        );
        assert_eq!(
            job_gsi1_sk(1_700_000_000, job_id),
            "001700000000#550e8400-e29b-41d4-a716-446655440002"
        );
        assert_eq!(
            script_job_gsi2_pk("codeforces", "2149G"),
            "SGJOB#codeforces#2149G"
        );
    }

    #[test]
    fn test_progress_keys() {
        let job_id = id("550e8400-e29b-41d4-a716-446655440002");
        let entry_id = id("550e8400-e29b-41d4-a716-446655440003");
        assert_eq!(
            progress_pk(JobType::ScriptGeneration, job_id),
            "JOB#script_generation#550e8400-e29b-41d4-a716-446655440002"
        );
        assert_eq!(
            progress_sk(1_700_000_000_123, entry_id),
            "PROG#01700000000123#550e8400-e29b-41d4-a716-446655440003"
        );
    }

    #[test]
    fn test_padded_timestamps_sort_chronologically() {
        assert!(pad_secs(999) < pad_secs(1_000));
        assert!(pad_millis(999_999) < pad_millis(1_000_000));
        // Unpadded, "999" > "1000" lexicographically.
        assert!("999" > "1000");
    }

    #[test]
    fn test_history_keys() {
        let history_id = id("550e8400-e29b-41d4-a716-446655440004");
        let user_id = id("550e8400-e29b-41d4-a716-446655440001");
        assert_eq!(
            history_pk(history_id),
            "HIST#550e8400-e29b-41d4-a716-446655440004"
        );
        assert_eq!(
            history_gsi1_pk(user_id),
            "USER#550e8400-e29b-41d4-a716-446655440001"
        );
        assert_eq!(history_gsi1_sk(1_700_000_000_123), "HIST#01700000000123");
        assert_eq!(history_gsi2_sk(1_700_000_000_123), "01700000000123");
    }

    #[test]
    fn test_usage_keys() {
        let user_id = id("550e8400-e29b-41d4-a716-446655440001");
        let day = chrono::NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_eq!(
            usage_pk(user_id, day),
            "USAGE#550e8400-e29b-41d4-a716-446655440001#2026-08-23"
        );
    }

    #[test]
    fn test_plan_keys() {
        assert_eq!(plan_pk(), "PLAN");
        assert_eq!(plan_sk("pro"), "META#pro");
        assert_eq!(legacy_plan_pk("pro"), "PLAN#pro");
    }
}
