use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{FinanceStore, MarkPaid, StoreResult};
use crate::auth::identity::VerifiedIdentity;
use crate::models::{Expense, Saving, ScoreRecord, Snapshot, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    expenses: Vec<Expense>,
    savings: Vec<Saving>,
    scores: HashMap<Uuid, ScoreRecord>,
}

/// Process-local store. A single lock guards all tables so a snapshot sees
/// expenses and savings from the same instant.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Tables are append-only apart from deletes, so vector order is creation order.
fn user_expenses(t: &Tables, user_id: Uuid) -> Vec<Expense> {
    t.expenses
        .iter()
        .filter(|e| e.user_id == user_id)
        .cloned()
        .collect()
}

fn user_savings(t: &Tables, user_id: Uuid) -> Vec<Saving> {
    t.savings
        .iter()
        .filter(|s| s.user_id == user_id)
        .cloned()
        .collect()
}

fn newest_first<T>(mut rows: Vec<T>) -> Vec<T> {
    rows.reverse();
    rows
}

#[async_trait]
impl FinanceStore for MemoryStore {
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter().find(|u| u.external_id == identity.subject) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            external_id: identity.subject.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            email_verified: identity.email_verified,
            created_at: OffsetDateTime::now_utc(),
        };
        debug!(user_id = %user.id, "user created");
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn insert_expense(&self, expense: Expense) -> StoreResult<Expense> {
        self.tables.write().await.expenses.push(expense.clone());
        Ok(expense)
    }

    async fn list_expenses(&self, user_id: Uuid) -> StoreResult<Vec<Expense>> {
        let t = self.tables.read().await;
        Ok(newest_first(user_expenses(&t, user_id)))
    }

    async fn mark_expense_paid(
        &self,
        user_id: Uuid,
        expense_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<MarkPaid> {
        let mut t = self.tables.write().await;
        let Some(expense) = t
            .expenses
            .iter_mut()
            .find(|e| e.id == expense_id && e.user_id == user_id)
        else {
            return Ok(MarkPaid::NotFound);
        };
        if expense.mark_paid(at) {
            Ok(MarkPaid::Marked(expense.clone()))
        } else {
            Ok(MarkPaid::AlreadyPaid(expense.clone()))
        }
    }

    async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.expenses.len();
        t.expenses
            .retain(|e| !(e.id == expense_id && e.user_id == user_id));
        Ok(t.expenses.len() != before)
    }

    async fn insert_saving(&self, saving: Saving) -> StoreResult<Saving> {
        self.tables.write().await.savings.push(saving.clone());
        Ok(saving)
    }

    async fn list_savings(&self, user_id: Uuid) -> StoreResult<Vec<Saving>> {
        let t = self.tables.read().await;
        Ok(newest_first(user_savings(&t, user_id)))
    }

    async fn delete_saving(&self, user_id: Uuid, saving_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.savings.len();
        t.savings
            .retain(|s| !(s.id == saving_id && s.user_id == user_id));
        Ok(t.savings.len() != before)
    }

    async fn snapshot(&self, user_id: Uuid) -> StoreResult<Snapshot> {
        let t = self.tables.read().await;
        Ok(Snapshot {
            expenses: user_expenses(&t, user_id),
            savings: user_savings(&t, user_id),
        })
    }

    async fn save_score(&self, record: ScoreRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .scores
            .insert(record.user_id, record);
        Ok(())
    }

    async fn last_score(&self, user_id: Uuid) -> StoreResult<Option<ScoreRecord>> {
        Ok(self.tables.read().await.scores.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::score::ScoreFactors;
    use time::{macros::datetime, Duration};

    const T0: OffsetDateTime = datetime!(2024-05-01 9:00 UTC);

    fn identity(subject: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: subject.into(),
            email: format!("{subject}@example.com"),
            name: Some("Test".into()),
            picture: None,
            email_verified: true,
        }
    }

    fn expense(user_id: Uuid, offset_days: i64) -> Expense {
        Expense::new(
            user_id,
            format!("bill {offset_days}"),
            10.0,
            "Bills".into(),
            None,
            T0 + Duration::days(offset_days),
        )
    }

    #[tokio::test]
    async fn upsert_user_is_keyed_by_subject() {
        let store = MemoryStore::new();
        let a = store.upsert_user(&identity("sub-1")).await.unwrap();
        let again = store.upsert_user(&identity("sub-1")).await.unwrap();
        let b = store.upsert_user(&identity("sub-2")).await.unwrap();
        assert_eq!(a.id, again.id);
        assert_ne!(a.id, b.id);
        assert_eq!(store.find_user(a.id).await.unwrap().unwrap().email, "sub-1@example.com");
    }

    #[tokio::test]
    async fn lists_are_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert_expense(expense(alice, 0)).await.unwrap();
        store.insert_expense(expense(alice, 2)).await.unwrap();
        store.insert_expense(expense(bob, 1)).await.unwrap();

        let list = store.list_expenses(alice).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].description, "bill 2");
        assert_eq!(list[1].description, "bill 0");
    }

    #[tokio::test]
    async fn mark_paid_keeps_first_paid_date() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let e = store.insert_expense(expense(user, 0)).await.unwrap();

        let first = store.mark_expense_paid(user, e.id, T0).await.unwrap();
        assert!(matches!(first, MarkPaid::Marked(ref x) if x.paid_date == Some(T0)));

        let later = T0 + Duration::days(9);
        let second = store.mark_expense_paid(user, e.id, later).await.unwrap();
        assert!(matches!(second, MarkPaid::AlreadyPaid(ref x) if x.paid_date == Some(T0)));

        let stored = &store.list_expenses(user).await.unwrap()[0];
        assert_eq!(stored.paid_date, Some(T0));
    }

    #[tokio::test]
    async fn other_users_records_behave_as_missing() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let e = store.insert_expense(expense(owner, 0)).await.unwrap();

        assert_eq!(
            store.mark_expense_paid(intruder, e.id, T0).await.unwrap(),
            MarkPaid::NotFound
        );
        assert!(!store.delete_expense(intruder, e.id).await.unwrap());
        assert!(store.delete_expense(owner, e.id).await.unwrap());
        assert!(store.list_expenses(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_holds_both_collections() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_expense(expense(user, 0)).await.unwrap();
        let s = store
            .insert_saving(Saving::new(user, 25.0, "manual".into(), None, T0))
            .await
            .unwrap();

        let snap = store.snapshot(user).await.unwrap();
        assert_eq!(snap.expenses.len(), 1);
        assert_eq!(snap.savings, vec![s.clone()]);

        assert!(store.delete_saving(user, s.id).await.unwrap());
        assert!(store.snapshot(user).await.unwrap().savings.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_in_creation_order() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for offset in [0, 1, 2] {
            store.insert_expense(expense(user, offset)).await.unwrap();
        }

        let snap = store.snapshot(user).await.unwrap();
        let names: Vec<_> = snap.expenses.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, ["bill 0", "bill 1", "bill 2"]);

        let listed = store.list_expenses(user).await.unwrap();
        assert_eq!(listed[0].description, "bill 2");
    }

    #[tokio::test]
    async fn score_record_is_replaced() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for score in [10, 42] {
            store
                .save_score(ScoreRecord {
                    user_id: user,
                    score,
                    factors: ScoreFactors::default(),
                    last_updated: T0,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.last_score(user).await.unwrap().unwrap().score, 42);
        assert!(store.last_score(Uuid::new_v4()).await.unwrap().is_none());
    }
}
