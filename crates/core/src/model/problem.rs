use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A problem extracted from an external judge, identified by
/// `(platform, problem_id)` such as `("codeforces", "2149G")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub platform: String,
    pub problem_id: String,
    pub title: String,
    pub url: Option<String>,
    pub difficulty: Option<i64>,
    /// Completed problems have a verified reference solution and test cases;
    /// everything else is a draft.
    pub completed: bool,
    /// Reference solution source, once generated.
    pub solution: Option<String>,
    /// Cached count of child test-case items. Kept in sync by the writer and
    /// repaired by the count-backfill migration when drifted.
    pub test_case_count: u32,
    /// Soft-delete marker. `None` means the problem is live.
    pub deleted: Option<Deletion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Soft-delete metadata. Undeleting removes this wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub at: DateTime<Utc>,
    pub reason: String,
}

impl Problem {
    /// Creates a new draft problem with no test cases.
    pub fn new(
        platform: impl Into<String>,
        problem_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            platform: platform.into(),
            problem_id: problem_id.into(),
            title: title.into(),
            url: None,
            difficulty: None,
            completed: false,
            solution: None,
            test_case_count: 0,
            deleted: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the judge URL for this problem.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

/// A single test case belonging to a problem.
///
/// `input`/`output` are always the full payload: the storage layer decides
/// whether they live inline in the item or compressed in blob storage, and
/// rehydrates transparently on read. Callers never see the difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub index: u32,
    pub input: String,
    pub output: String,
}
