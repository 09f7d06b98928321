use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::insights::score::ScoreFactors;

/// Account created on first login through the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String, // subject at the identity provider
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A bill or spending entry. `paid_date` is set iff `is_paid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub is_paid: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub paid_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Expense {
    pub fn new(
        user_id: Uuid,
        description: String,
        amount: f64,
        category: String,
        due_date: Option<OffsetDateTime>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            description,
            amount,
            category,
            due_date,
            is_paid: false,
            paid_date: None,
            created_at,
        }
    }

    /// Marks the expense paid at `at`. Returns false, leaving the
    /// existing paid date in place, when it was already paid.
    pub fn mark_paid(&mut self, at: OffsetDateTime) -> bool {
        if self.is_paid {
            return false;
        }
        self.is_paid = true;
        self.paid_date = Some(at);
        true
    }

    /// Unpaid with a due date strictly before `now`.
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        !self.is_paid && self.due_date.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Saving {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub const DEFAULT_SAVING_KIND: &str = "manual";

impl Saving {
    pub fn new(
        user_id: Uuid,
        amount: f64,
        kind: String,
        description: Option<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            kind,
            description,
            created_at,
        }
    }
}

/// Last computed score for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub user_id: Uuid,
    pub score: u32,
    pub factors: ScoreFactors,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// One user's expenses and savings read together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub expenses: Vec<Expense>,
    pub savings: Vec<Saving>,
}
