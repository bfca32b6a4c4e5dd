use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan id every user falls back to when no plan reference is set.
pub const FREE_PLAN_ID: &str = "free";

/// A subscription plan. Small, rarely-mutated reference data: all plans live
/// in a single shared partition so "list all plans" is one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    /// Short stable identifier, e.g. "free" or "pro".
    pub id: String,
    pub name: String,
    /// Monthly price in cents.
    pub price_cents: i64,
    /// Submissions allowed per user per day.
    pub daily_submission_limit: u32,
    /// LLM generation jobs allowed per user per day.
    pub daily_generation_limit: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    /// The built-in free plan.
    pub fn free() -> Self {
        let now = Utc::now();
        Self {
            id: FREE_PLAN_ID.to_string(),
            name: "Free".to_string(),
            price_cents: 0,
            daily_submission_limit: 20,
            daily_generation_limit: 3,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_id_matches_constant() {
        assert_eq!(SubscriptionPlan::free().id, FREE_PLAN_ID);
    }
}
