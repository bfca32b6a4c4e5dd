use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two background job families the platform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    /// LLM generation of test cases and a reference solution for a problem.
    ScriptGeneration,
    /// Extraction of a problem statement from an external judge.
    ProblemExtraction,
}

impl JobType {
    /// Stable lowercase name used inside partition keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ScriptGeneration => "script_generation",
            JobType::ProblemExtraction => "problem_extraction",
        }
    }
}

/// Lifecycle state of a background job. Transitions are last-write-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// A test-case/solution generation job for one problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGenerationJob {
    pub job_id: Uuid,
    pub platform: String,
    pub problem_id: String,
    pub language: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScriptGenerationJob {
    /// Creates a new pending job.
    pub fn new(
        platform: impl Into<String>,
        problem_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            platform: platform.into(),
            problem_id: problem_id.into(),
            language: language.into(),
            status: JobStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a specific ID for this job (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.job_id = id;
        self
    }
}

/// A problem-extraction job for one judge URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemExtractionJob {
    pub job_id: Uuid,
    pub url: String,
    pub platform: Option<String>,
    pub problem_id: Option<String>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProblemExtractionJob {
    /// Creates a new pending job.
    pub fn new(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            url: url.into(),
            platform: None,
            problem_id: None,
            status: JobStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a specific ID for this job (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.job_id = id;
        self
    }
}

/// Type-agnostic job row returned by status listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// A new progress entry to append to a job's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgress {
    pub step: String,
    pub message: String,
    pub status: JobStatus,
}

/// One recorded progress entry. Append-only; never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub step: String,
    pub message: String,
    pub status: JobStatus,
    pub recorded_at: DateTime<Utc>,
}
