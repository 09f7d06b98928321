use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{parse_due_date, CreateExpenseRequest, ExpenseMessage, Message};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    extract::ApiJson,
    insights::score::is_valid_amount,
    models::Expense,
    state::AppState,
    store::MarkPaid,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id/paid", put(mark_paid))
        .route("/expenses/:id", delete(delete_expense))
}

#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Expense>>> {
    Ok(Json(state.store.list_expenses(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let description = payload.description.trim();
    let category = payload.category.trim();
    let amount = payload.amount.filter(|a| is_valid_amount(*a));

    let Some(amount) = amount else {
        return Err(AppError::bad_request("Invalid input data"));
    };
    if description.is_empty() || category.is_empty() {
        return Err(AppError::bad_request("Invalid input data"));
    }

    let due_date = match payload.due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            Some(parse_due_date(raw).ok_or_else(|| AppError::bad_request("Invalid due date"))?)
        }
    };

    let expense = Expense::new(
        user_id,
        description.to_string(),
        amount,
        category.to_string(),
        due_date,
        OffsetDateTime::now_utc(),
    );
    let expense = state.store.insert_expense(expense).await?;

    info!(%user_id, expense_id = %expense.id, "expense created");
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Ids that are not UUIDs cannot name a stored expense.
fn expense_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Expense not found"))
}

#[instrument(skip(state))]
pub async fn mark_paid(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ExpenseMessage>> {
    let id = expense_id(&id)?;
    let outcome = state
        .store
        .mark_expense_paid(user_id, id, OffsetDateTime::now_utc())
        .await?;

    match outcome {
        MarkPaid::Marked(expense) => {
            info!(%user_id, expense_id = %id, "expense marked paid");
            Ok(Json(ExpenseMessage {
                message: "Expense marked as paid",
                expense,
            }))
        }
        MarkPaid::AlreadyPaid(expense) => Ok(Json(ExpenseMessage {
            message: "Expense already marked as paid",
            expense,
        })),
        MarkPaid::NotFound => Err(AppError::not_found("Expense not found")),
    }
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    let id = expense_id(&id)?;
    if !state.store.delete_expense(user_id, id).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    info!(%user_id, expense_id = %id, "expense deleted");
    Ok(Json(Message {
        message: "Expense deleted successfully",
    }))
}
