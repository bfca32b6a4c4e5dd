use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One submitted solution and its verdict, kept as the user's search history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub problem_id: String,
    pub language: String,
    pub code: String,
    /// Pass/fail summary of the execution, e.g. "12/12 passed".
    pub verdict: Option<String>,
    /// Public entries appear in the shared feed; private ones never do.
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchHistory {
    /// Creates a new private history entry.
    pub fn new(
        user_id: Uuid,
        platform: impl Into<String>,
        problem_id: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            platform: platform.into(),
            problem_id: problem_id.into(),
            language: language.into(),
            code: code.into(),
            verdict: None,
            public: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a specific ID for this entry (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_is_private() {
        let entry = SearchHistory::new(Uuid::new_v4(), "codeforces", "2149G", "python", "print()");
        assert!(!entry.public);
        assert_eq!(entry.verdict, None);
    }
}
