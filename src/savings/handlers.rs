use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    expenses::dto::Message,
    extract::ApiJson,
    insights::score::is_valid_amount,
    models::{Saving, DEFAULT_SAVING_KIND},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateSavingRequest {
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

pub fn saving_routes() -> Router<AppState> {
    Router::new()
        .route("/savings", get(list_savings).post(create_saving))
        .route("/savings/:id", delete(delete_saving))
}

#[instrument(skip(state))]
pub async fn list_savings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Saving>>> {
    Ok(Json(state.store.list_savings(user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_saving(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreateSavingRequest>,
) -> AppResult<(StatusCode, Json<Saving>)> {
    let amount = payload
        .amount
        .filter(|a| is_valid_amount(*a))
        .ok_or_else(|| AppError::bad_request("Invalid amount"))?;

    let kind = payload
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_SAVING_KIND)
        .to_string();
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let saving = Saving::new(user_id, amount, kind, description, OffsetDateTime::now_utc());
    let saving = state.store.insert_saving(saving).await?;

    info!(%user_id, saving_id = %saving.id, "saving recorded");
    Ok((StatusCode::CREATED, Json(saving)))
}

#[instrument(skip(state))]
pub async fn delete_saving(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::not_found("Savings not found"))?;
    if !state.store.delete_saving(user_id, id).await? {
        return Err(AppError::not_found("Savings not found"));
    }
    info!(%user_id, saving_id = %id, "saving deleted");
    Ok(Json(Message {
        message: "Savings deleted successfully",
    }))
}
