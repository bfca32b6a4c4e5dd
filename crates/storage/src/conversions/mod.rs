//! Conversions between domain types and storage items.
//!
//! Pure functions, testable in isolation without a storage engine. Each
//! entity family gets an `<entity>_to_item` builder and an
//! `item_to_<entity>` decoder. Payload fields live under short names inside
//! the `dat` map; decoding ignores attributes it does not know, so adding a
//! field never breaks old readers.

mod history;
mod job;
mod plan;
mod problem;
mod progress;
mod usage;
mod user;

pub use history::{history_to_item, item_to_history};
pub use job::{
    extraction_job_to_item, item_to_extraction_job, item_to_job_summary, item_to_script_job,
    script_job_to_item,
};
pub use plan::{item_to_plan, plan_to_item};
pub use problem::{
    inline_test_case_to_item, item_to_problem, item_to_test_case_record, offloaded_test_case_to_item,
    problem_to_item, TestCaseRecord,
};
pub use progress::{item_to_progress, progress_to_item};
pub use usage::{item_to_usage, usage_to_item};
pub use user::{item_to_user, user_to_item};
