//! Domain model for the algoprep platform.

mod history;
mod job;
mod plan;
mod problem;
mod usage;
mod user;

pub use history::SearchHistory;
pub use job::{
    JobStatus, JobSummary, JobType, NewProgress, ProblemExtractionJob, ProgressEntry,
    ScriptGenerationJob,
};
pub use plan::{SubscriptionPlan, FREE_PLAN_ID};
pub use problem::{Deletion, Problem, TestCase};
pub use usage::UsageLog;
pub use user::{TokenSubject, User};
