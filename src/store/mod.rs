//! Persistence seam. Handlers only see [`FinanceStore`]; the concrete
//! backend is picked at startup from configuration.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::identity::VerifiedIdentity;
use crate::models::{Expense, Saving, ScoreRecord, Snapshot, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of marking an expense paid.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkPaid {
    Marked(Expense),
    /// Already paid; returned unchanged.
    AlreadyPaid(Expense),
    NotFound,
}

/// Storage of users and their records. Every record operation is scoped
/// by owner; a record belonging to someone else behaves as missing.
#[async_trait]
pub trait FinanceStore: Send + Sync {
    /// Finds the user by provider subject, creating it on first login.
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> StoreResult<User>;
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_expense(&self, expense: Expense) -> StoreResult<Expense>;
    /// Newest first.
    async fn list_expenses(&self, user_id: Uuid) -> StoreResult<Vec<Expense>>;
    async fn mark_expense_paid(
        &self,
        user_id: Uuid,
        expense_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<MarkPaid>;
    async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> StoreResult<bool>;

    async fn insert_saving(&self, saving: Saving) -> StoreResult<Saving>;
    /// Newest first.
    async fn list_savings(&self, user_id: Uuid) -> StoreResult<Vec<Saving>>;
    async fn delete_saving(&self, user_id: Uuid, saving_id: Uuid) -> StoreResult<bool>;

    /// Expenses and savings of one user read as a single consistent view,
    /// both in creation order (oldest first).
    async fn snapshot(&self, user_id: Uuid) -> StoreResult<Snapshot>;

    async fn save_score(&self, record: ScoreRecord) -> StoreResult<()>;
    async fn last_score(&self, user_id: Uuid) -> StoreResult<Option<ScoreRecord>>;
}
