//! Storage trait surface consumed by the request-serving layer and the
//! background task runner, implemented by `algoprep_storage`.

mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{
    JobRepository, PlanRepository, ProblemRepository, ProgressRepository,
    SearchHistoryRepository, UsageRepository, UserRepository,
};
pub use types::Page;
