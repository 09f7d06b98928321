use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{FinanceStore, MarkPaid, StoreError, StoreResult};
use crate::auth::identity::VerifiedIdentity;
use crate::insights::score::ScoreFactors;
use crate::models::{Expense, Saving, ScoreRecord, Snapshot, User};

const EXPENSE_COLUMNS: &str =
    "id, user_id, description, amount, category, due_date, is_paid, paid_date, created_at";
const SAVING_COLUMNS: &str = "id, user_id, amount, kind, description, created_at";

/// Postgres-backed store; schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(FromRow)]
struct ScoreRow {
    user_id: Uuid,
    score: i32,
    bill_payment_consistency: i32,
    savings_discipline: i32,
    cash_flow_management: i32,
    overdue_bills: i32,
    last_updated: OffsetDateTime,
}

fn non_negative(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

impl TryFrom<ScoreRow> for ScoreRecord {
    type Error = StoreError;

    fn try_from(r: ScoreRow) -> StoreResult<Self> {
        Ok(Self {
            user_id: r.user_id,
            score: non_negative(r.score, "score")?,
            factors: ScoreFactors {
                bill_payment_consistency: non_negative(
                    r.bill_payment_consistency,
                    "bill_payment_consistency",
                )?,
                savings_discipline: non_negative(r.savings_discipline, "savings_discipline")?,
                cash_flow_management: non_negative(
                    r.cash_flow_management,
                    "cash_flow_management",
                )?,
                overdue_bills: non_negative(r.overdue_bills, "overdue_bills")?,
            },
            last_updated: r.last_updated,
        })
    }
}

#[async_trait]
impl FinanceStore for PgStore {
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> StoreResult<User> {
        // no-op update so RETURNING yields the existing row on conflict
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, external_id, email, name, picture, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id, external_id, email, name, picture, email_verified, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.picture)
        .bind(identity.email_verified)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, email, name, picture, email_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert_expense(&self, expense: Expense) -> StoreResult<Expense> {
        let sql = format!(
            "INSERT INTO expenses ({EXPENSE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {EXPENSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Expense>(&sql)
            .bind(expense.id)
            .bind(expense.user_id)
            .bind(&expense.description)
            .bind(expense.amount)
            .bind(&expense.category)
            .bind(expense.due_date)
            .bind(expense.is_paid)
            .bind(expense.paid_date)
            .bind(expense.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn list_expenses(&self, user_id: Uuid) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, Expense>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn mark_expense_paid(
        &self,
        user_id: Uuid,
        expense_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<MarkPaid> {
        let sql = format!(
            "UPDATE expenses SET is_paid = TRUE, paid_date = $3 \
             WHERE id = $1 AND user_id = $2 AND is_paid = FALSE \
             RETURNING {EXPENSE_COLUMNS}"
        );
        let marked = sqlx::query_as::<_, Expense>(&sql)
            .bind(expense_id)
            .bind(user_id)
            .bind(at)
            .fetch_optional(&self.db)
            .await?;
        if let Some(expense) = marked {
            return Ok(MarkPaid::Marked(expense));
        }

        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2");
        let existing = sqlx::query_as::<_, Expense>(&sql)
            .bind(expense_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(existing.map_or(MarkPaid::NotFound, MarkPaid::AlreadyPaid))
    }

    async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(expense_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_saving(&self, saving: Saving) -> StoreResult<Saving> {
        let sql = format!(
            "INSERT INTO savings ({SAVING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {SAVING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Saving>(&sql)
            .bind(saving.id)
            .bind(saving.user_id)
            .bind(saving.amount)
            .bind(&saving.kind)
            .bind(&saving.description)
            .bind(saving.created_at)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn list_savings(&self, user_id: Uuid) -> StoreResult<Vec<Saving>> {
        let sql = format!(
            "SELECT {SAVING_COLUMNS} FROM savings WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, Saving>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn delete_saving(&self, user_id: Uuid, saving_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM savings WHERE id = $1 AND user_id = $2")
            .bind(saving_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn snapshot(&self, user_id: Uuid) -> StoreResult<Snapshot> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE user_id = $1 ORDER BY created_at ASC"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {SAVING_COLUMNS} FROM savings WHERE user_id = $1 ORDER BY created_at ASC"
        );
        let savings = sqlx::query_as::<_, Saving>(&sql)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Snapshot { expenses, savings })
    }

    async fn save_score(&self, record: ScoreRecord) -> StoreResult<()> {
        let f = record.factors;
        sqlx::query(
            r#"
            INSERT INTO scores (user_id, score, bill_payment_consistency, savings_discipline,
                                cash_flow_management, overdue_bills, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                score = EXCLUDED.score,
                bill_payment_consistency = EXCLUDED.bill_payment_consistency,
                savings_discipline = EXCLUDED.savings_discipline,
                cash_flow_management = EXCLUDED.cash_flow_management,
                overdue_bills = EXCLUDED.overdue_bills,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(record.user_id)
        .bind(record.score as i32)
        .bind(f.bill_payment_consistency as i32)
        .bind(f.savings_discipline as i32)
        .bind(f.cash_flow_management as i32)
        .bind(f.overdue_bills as i32)
        .bind(record.last_updated)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn last_score(&self, user_id: Uuid) -> StoreResult<Option<ScoreRecord>> {
        let row = sqlx::query_as::<_, ScoreRow>(
            r#"
            SELECT user_id, score, bill_payment_consistency, savings_discipline,
                   cash_flow_management, overdue_bills, last_updated
            FROM scores
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(ScoreRecord::try_from).transpose()
    }
}
