use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::FREE_PLAN_ID;

/// A registered platform user.
///
/// Email addresses are globally unique; `plan_id` references a
/// [`super::SubscriptionPlan`] and falls back to the free plan when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// OAuth identity, when the account was created through an external provider.
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
    /// Subscription plan reference. `None` means the free plan.
    pub plan_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active user on the free plan.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            oauth_provider: None,
            oauth_subject: None,
            plan_id: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches an external OAuth identity.
    pub fn with_oauth(mut self, provider: impl Into<String>, subject: impl Into<String>) -> Self {
        self.oauth_provider = Some(provider.into());
        self.oauth_subject = Some(subject.into());
        self
    }

    /// Sets a specific ID for this user (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// The effective plan id, defaulting to the free plan.
    pub fn effective_plan_id(&self) -> &str {
        self.plan_id.as_deref().unwrap_or(FREE_PLAN_ID)
    }
}

/// The fixed view of a user that the token issuer consumes.
///
/// The issuer never sees the full [`User`]; it gets exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSubject {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            active: user.active,
        }
    }
}
