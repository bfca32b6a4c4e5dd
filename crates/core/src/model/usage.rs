use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One usage event, partitioned by user and day for cheap quota checks.
///
/// Usage logs are append-only: never updated, pruned by TTL or explicit
/// cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,
    /// What was consumed, e.g. "submission" or "generation".
    pub action: String,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl UsageLog {
    /// Creates a usage event stamped with the current time.
    pub fn new(user_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action: action.into(),
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    /// The day this event counts against, in UTC.
    pub fn day(&self) -> NaiveDate {
        self.recorded_at.date_naive()
    }
}
